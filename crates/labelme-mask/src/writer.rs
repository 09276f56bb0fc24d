// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Writers for conversion results.
//!
//! A conversion named `stem` is written as three files in the output
//! directory:
//!
//! - `<stem>_image.png`: the resampled image
//! - `<stem>_mask.png`: label indices as 8-bit (or 16-bit) greyscale
//! - `<stem>_labels.json`: the vocabulary, `labels[i]` names mask value `i`

use crate::{Conversion, Error};
use image::{DynamicImage, ImageFormat};
use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Cursor, Write},
    path::{Path, PathBuf},
};

/// Options for [`MaskWriter`].
#[derive(Debug, Clone)]
pub struct MaskWriteOptions {
    /// Also write the resampled image next to the mask.
    pub write_image: bool,
    /// Pretty-print the labels JSON.
    pub pretty: bool,
}

impl Default for MaskWriteOptions {
    fn default() -> Self {
        Self {
            write_image: true,
            pretty: false,
        }
    }
}

/// Paths produced by [`MaskWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub image: Option<PathBuf>,
    pub mask: PathBuf,
    pub labels: PathBuf,
}

/// Writes conversion results to disk.
///
/// # Example
///
/// ```rust,no_run
/// use labelme_mask::{ConvertOptions, MaskWriter, convert_file};
///
/// let conversion = convert_file("bee_flower.json", &ConvertOptions::default())?;
/// let files = MaskWriter::new().write(&conversion, "out", "bee_flower")?;
/// println!("mask written to {}", files.mask.display());
/// # Ok::<(), labelme_mask::Error>(())
/// ```
pub struct MaskWriter {
    options: MaskWriteOptions,
}

impl MaskWriter {
    pub fn new() -> Self {
        Self {
            options: MaskWriteOptions::default(),
        }
    }

    pub fn with_options(options: MaskWriteOptions) -> Self {
        Self { options }
    }

    /// Write `conversion` into `dir` using `stem` as the file name prefix.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip(self, conversion, dir)))]
    pub fn write<P: AsRef<Path>>(
        &self,
        conversion: &Conversion,
        dir: P,
        stem: &str,
    ) -> Result<WrittenFiles, Error> {
        if stem.is_empty() {
            return Err(Error::InvalidParameters(
                "output file stem must not be empty".to_string(),
            ));
        }

        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }

        // Encode everything up front so a failure leaves no partial output.
        let mask_png = encode_png(&conversion.mask.to_image()?)?;
        let labels_json = self.encode_labels(conversion)?;
        let image_png = if self.options.write_image {
            Some(encode_png(&png_compatible(conversion.pixel_grid.as_image()))?)
        } else {
            None
        };

        let mask = dir.join(format!("{}_mask.png", stem));
        write_file(&mask, &mask_png)?;

        let labels = dir.join(format!("{}_labels.json", stem));
        write_file(&labels, &labels_json)?;

        let image = match image_png {
            Some(bytes) => {
                let path = dir.join(format!("{}_image.png", stem));
                write_file(&path, &bytes)?;
                Some(path)
            }
            None => None,
        };

        log::debug!("Wrote {} to {}", stem, dir.display());

        Ok(WrittenFiles {
            image,
            mask,
            labels,
        })
    }

    fn encode_labels(&self, conversion: &Conversion) -> Result<Vec<u8>, Error> {
        if self.options.pretty {
            serde_json::to_vec_pretty(&conversion.label_vocabulary)
        } else {
            serde_json::to_vec(&conversion.label_vocabulary)
        }
        .map_err(|err| Error::IoError(std::io::Error::from(err)))
    }
}

impl Default for MaskWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// PNG holds up to 16 bits per channel; float images are narrowed to 16 bits.
fn png_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageRgb32F(_) => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
        DynamicImage::ImageRgba32F(_) => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
        _ => Cow::Borrowed(image),
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| match err {
            image::ImageError::IoError(e) => Error::IoError(e),
            other => Error::UnsupportedFormat(format!("PNG encoding failed: {}", other)),
        })?;
    Ok(bytes)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
