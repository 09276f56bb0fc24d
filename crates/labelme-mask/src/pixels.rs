// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Decoding and resampling of the embedded annotation image.

use crate::Error;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, imageops::FilterType};

/// Decoded image after resampling; the canvas the mask is aligned with.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    image: DynamicImage,
}

impl PixelGrid {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of channels per pixel (1 for grey, 3 for RGB, ...).
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height() as usize,
            self.width() as usize,
            self.channels() as usize,
        )
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Check that `factor` is a finite number greater than zero.
pub fn validate_scale(factor: f64) -> Result<(), Error> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidScale(factor))
    }
}

/// Dimensions of an image of `width`×`height` scaled by `factor`.
///
/// Each side is rounded to the nearest pixel and never drops below one.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> Result<(u32, u32), Error> {
    validate_scale(factor)?;
    let scale = |side: u32| (side as f64 * factor).round().max(1.0) as u32;
    Ok((scale(width), scale(height)))
}

/// Decode a base64 image payload (PNG, JPEG, BMP or TIFF).
///
/// ASCII whitespace inside the payload is ignored since some writers wrap
/// long base64 lines.
pub fn decode_image_data(payload: &str) -> Result<DynamicImage, Error> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(Error::ImageDecodeError("image payload is empty".to_string()));
    }

    let bytes = STANDARD.decode(compact.as_bytes())?;
    let image = image::load_from_memory(&bytes)?;

    log::debug!(
        "Decoded {}x{} {:?} image from {} bytes",
        image.width(),
        image.height(),
        image.color(),
        bytes.len()
    );

    Ok(image)
}

/// Resample `image` by `factor` with an anti-aliased triangle filter.
///
/// The filter support grows with the reduction ratio so downscaling averages
/// every contributing source pixel instead of skipping them.
pub fn resample(image: DynamicImage, factor: f64) -> Result<PixelGrid, Error> {
    let (width, height) = scaled_dimensions(image.width(), image.height(), factor)?;

    if width == image.width() && height == image.height() {
        return Ok(PixelGrid::new(image));
    }

    log::debug!(
        "Resampling {}x{} -> {}x{} (factor {})",
        image.width(),
        image.height(),
        width,
        height,
        factor
    );

    Ok(PixelGrid::new(image.resize_exact(
        width,
        height,
        FilterType::Triangle,
    )))
}

/// Decode a base64 payload and resample it by `factor`.
///
/// The factor is validated before any decoding work is done.
#[cfg_attr(feature = "profiling", tracing::instrument(skip(payload)))]
pub fn decode_and_resample(payload: &str, factor: f64) -> Result<PixelGrid, Error> {
    validate_scale(factor)?;
    let image = decode_image_data(payload)?;
    resample(image, factor)
}
