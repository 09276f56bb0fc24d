// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end conversion of an annotation document into an image and mask.

use crate::{
    AnnotationDocument, Error, LabelVocabulary, Mask, PixelGrid, RasterStrategy, Rasterizer,
    labels::label_shapes,
    pixels::{decode_and_resample, validate_scale},
};
use std::path::Path;

/// Resize factor applied when none is given.
pub const DEFAULT_RESIZE_FACTOR: f64 = 0.25;

/// Options for [`convert_document`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    /// Scale applied to both the image and every polygon. Must be > 0.
    pub resize_factor: f64,
    /// Pixel scan strategy used by the rasterizer.
    pub strategy: RasterStrategy,
    /// Compute polygon coverage on the rayon pool.
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            resize_factor: DEFAULT_RESIZE_FACTOR,
            strategy: RasterStrategy::default(),
            parallel: false,
        }
    }
}

impl ConvertOptions {
    pub fn with_resize_factor(mut self, resize_factor: f64) -> Self {
        self.resize_factor = resize_factor;
        self
    }

    pub fn with_strategy(mut self, strategy: RasterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Result of a conversion: the resampled image, its aligned mask and the
/// name of every mask value.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub pixel_grid: PixelGrid,
    pub mask: Mask,
    pub label_vocabulary: LabelVocabulary,
}

impl Conversion {
    /// Split into `(pixel_grid, mask, label_vocabulary)`.
    pub fn into_parts(self) -> (PixelGrid, Mask, LabelVocabulary) {
        (self.pixel_grid, self.mask, self.label_vocabulary)
    }
}

/// Convert a parsed document into an image, mask and vocabulary.
///
/// Labels are resolved before the image is decoded so input errors surface
/// without paying for decoding.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, fields(shapes = document.shapes.len())))]
pub fn convert_document(
    document: &AnnotationDocument,
    options: &ConvertOptions,
) -> Result<Conversion, Error> {
    validate_scale(options.resize_factor)?;

    let (label_vocabulary, polygons) = label_shapes(&document.shapes)?;

    for (index, shape) in document.shapes.iter().enumerate() {
        if shape.points.len() < 3 {
            log::warn!(
                "Shape {} ({:?}) has {} point(s) and cannot enclose any pixel",
                index,
                shape.label,
                shape.points.len()
            );
        }
    }

    let pixel_grid = decode_and_resample(&document.image_data, options.resize_factor)?;
    check_declared_size(document, &pixel_grid, options.resize_factor);

    let scaled: Vec<_> = polygons
        .iter()
        .map(|p| p.scaled(options.resize_factor))
        .collect();

    let mask = Rasterizer::new(options.strategy)
        .with_parallel(options.parallel)
        .rasterize(pixel_grid.width(), pixel_grid.height(), &scaled);

    log::debug!(
        "Rasterized {} polygons onto {}x{} mask ({} classes, {} background pixels)",
        scaled.len(),
        mask.width(),
        mask.height(),
        label_vocabulary.len(),
        mask.count(0)
    );

    Ok(Conversion {
        pixel_grid,
        mask,
        label_vocabulary,
    })
}

/// Read a document from `path` and convert it.
pub fn convert_file<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<Conversion, Error> {
    let path = path.as_ref();
    log::debug!("Converting {}", path.display());
    let document = AnnotationDocument::read_json(path)?;
    convert_document(&document, options)
}

/// Warn when the size declared in the document disagrees with the decoded
/// image. Polygons are in the coordinates of the declared image, so a
/// mismatch usually means the wrong image was embedded.
fn check_declared_size(document: &AnnotationDocument, grid: &PixelGrid, factor: f64) {
    if let (Some(width), Some(height)) = (document.image_width, document.image_height)
        && let Ok((expected_w, expected_h)) =
            crate::pixels::scaled_dimensions(width, height, factor)
        && (expected_w, expected_h) != (grid.width(), grid.height())
    {
        log::warn!(
            "Declared image size {}x{} scales to {}x{} but the embedded image resampled to {}x{}",
            width,
            height,
            expected_w,
            expected_h,
            grid.width(),
            grid.height()
        );
    }
}
