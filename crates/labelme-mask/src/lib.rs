// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # LabelMe Mask
//!
//! Converts polygon annotations drawn in LabelMe into dense per-pixel label
//! masks aligned with the annotated image, ready for training pixel-wise
//! classifiers.
//!
//! ## Pipeline
//!
//! 1. **Parse** the annotation JSON into an [`AnnotationDocument`].
//! 2. **Resolve labels** into a [`LabelVocabulary`]: the sorted set of label
//!    strings with `"Background"` at index 0.
//! 3. **Decode and resample** the embedded image by the resize factor into a
//!    [`PixelGrid`].
//! 4. **Rasterize** every polygon, scaled by the same factor, into a
//!    [`Mask`]. Polygons are stamped in drawing order so the last drawn
//!    polygon wins where shapes overlap.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labelme_mask::{ConvertOptions, convert_file};
//!
//! let options = ConvertOptions::default().with_resize_factor(0.5);
//! let (grid, mask, labels) = convert_file("bee_flower.json", &options)?.into_parts();
//!
//! assert_eq!(mask.shape(), (grid.shape().0, grid.shape().1));
//! for (index, name) in labels.iter() {
//!     println!("{}: {} ({} pixels)", index, name, mask.count(index));
//! }
//! # Ok::<(), labelme_mask::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans around the conversion stages.

mod convert;
mod document;
mod error;
mod labels;
mod mask;
mod pixels;
mod rasterize;
mod writer;

pub use crate::{
    convert::{Conversion, ConvertOptions, DEFAULT_RESIZE_FACTOR, convert_document, convert_file},
    document::{AnnotationDocument, ShapeRecord},
    error::Error,
    labels::{BACKGROUND, LabelVocabulary, LabeledPolygon, label_shapes, resolve_labels},
    mask::{Mask, MaskCompositor},
    pixels::{
        PixelGrid, decode_and_resample, decode_image_data, resample, scaled_dimensions,
        validate_scale,
    },
    rasterize::{Coverage, RasterStrategy, Rasterizer, Span, point_in_polygon, polygon_coverage},
    writer::{MaskWriteOptions, MaskWriter, WrittenFiles},
};
