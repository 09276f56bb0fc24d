// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Label mask buffer and the compositing rule for overlapping polygons.

use crate::{Error, rasterize::Coverage};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

/// Dense per-pixel label indices in row-major order.
///
/// Value 0 is background; any other value `i` names vocabulary entry `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl Mask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    /// Label at pixel `(x, y)`, `None` outside the mask.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.data[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    pub fn row(&self, y: u32) -> &[u32] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.data
    }

    /// Largest label present, 0 for an empty or all-background mask.
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Number of pixels holding `label`.
    pub fn count(&self, label: u32) -> usize {
        self.data.iter().filter(|&&v| v == label).count()
    }

    /// Render the mask as a greyscale image whose pixel values are the labels.
    ///
    /// Uses 8 bits when every label fits, 16 bits otherwise.
    pub fn to_image(&self) -> Result<DynamicImage, Error> {
        let max = self.max_label();
        if max <= u8::MAX as u32 {
            let pixels = self.data.iter().map(|&v| v as u8).collect();
            let image = GrayImage::from_raw(self.width, self.height, pixels).ok_or_else(|| {
                Error::InvalidParameters("mask buffer does not match its dimensions".to_string())
            })?;
            Ok(DynamicImage::ImageLuma8(image))
        } else if max <= u16::MAX as u32 {
            let pixels = self.data.iter().map(|&v| v as u16).collect();
            let image: ImageBuffer<Luma<u16>, Vec<u16>> =
                ImageBuffer::from_raw(self.width, self.height, pixels).ok_or_else(|| {
                    Error::InvalidParameters(
                        "mask buffer does not match its dimensions".to_string(),
                    )
                })?;
            Ok(DynamicImage::ImageLuma16(image))
        } else {
            Err(Error::UnsupportedFormat(format!(
                "mask label {} does not fit in a 16-bit image",
                max
            )))
        }
    }
}

/// Owns the mask while polygons are stamped into it.
///
/// Stamps overwrite unconditionally, so when coverages are applied in drawing
/// order the last drawn polygon wins on overlap.
#[derive(Debug)]
pub struct MaskCompositor {
    mask: Mask,
    stamped: usize,
}

impl MaskCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mask: Mask::new(width, height),
            stamped: 0,
        }
    }

    /// Write `label` into every pixel of `coverage`.
    pub fn stamp(&mut self, label: u32, coverage: &Coverage) {
        let w = self.mask.width as usize;
        for span in coverage.spans() {
            let start = span.row as usize * w;
            self.mask.data[start + span.start as usize..start + span.end as usize].fill(label);
        }
        self.stamped += 1;
    }

    /// Number of coverages stamped so far.
    pub fn stamped(&self) -> usize {
        self.stamped
    }

    pub fn into_mask(self) -> Mask {
        self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::Span;

    fn coverage(spans: &[(u32, u32, u32)]) -> Coverage {
        Coverage::from_spans(
            spans
                .iter()
                .map(|&(row, start, end)| Span { row, start, end })
                .collect(),
        )
    }

    #[test]
    fn test_new_mask_is_background() {
        let mask = Mask::new(4, 3);
        assert_eq!(mask.shape(), (3, 4));
        assert_eq!(mask.count(0), 12);
        assert_eq!(mask.max_label(), 0);
        assert_eq!(mask.get(4, 0), None);
        assert_eq!(mask.get(0, 3), None);
    }

    #[test]
    fn test_stamp_last_wins() {
        let mut compositor = MaskCompositor::new(4, 2);
        compositor.stamp(1, &coverage(&[(0, 0, 3), (1, 0, 3)]));
        compositor.stamp(2, &coverage(&[(0, 2, 4)]));
        compositor.stamp(1, &coverage(&[(1, 3, 4)]));
        assert_eq!(compositor.stamped(), 3);

        let mask = compositor.into_mask();
        assert_eq!(mask.row(0), &[1, 1, 2, 2]);
        assert_eq!(mask.row(1), &[1, 1, 1, 1]);
    }

    #[test]
    fn test_later_lower_label_overwrites() {
        let mut compositor = MaskCompositor::new(2, 1);
        compositor.stamp(5, &coverage(&[(0, 0, 2)]));
        compositor.stamp(1, &coverage(&[(0, 1, 2)]));
        assert_eq!(compositor.into_mask().as_slice(), &[5, 1]);
    }

    #[test]
    fn test_to_image_depth() {
        let mut compositor = MaskCompositor::new(2, 2);
        compositor.stamp(3, &coverage(&[(1, 0, 2)]));
        let image = compositor.into_mask().to_image().unwrap();
        let gray = image.as_luma8().unwrap();
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 1)[0], 3);

        let mut compositor = MaskCompositor::new(1, 1);
        compositor.stamp(300, &coverage(&[(0, 0, 1)]));
        let image = compositor.into_mask().to_image().unwrap();
        assert_eq!(image.as_luma16().unwrap().get_pixel(0, 0)[0], 300);

        let mut compositor = MaskCompositor::new(1, 1);
        compositor.stamp(70_000, &coverage(&[(0, 0, 1)]));
        assert!(matches!(
            compositor.into_mask().to_image(),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
