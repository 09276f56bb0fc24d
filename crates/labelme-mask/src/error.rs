// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for annotation to mask conversion.
///
/// Every failure is fatal to the conversion call that produced it; no partial
/// mask is ever returned alongside an error. Degenerate polygon geometry is
/// not an error and has no variant here.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred while reading a document or writing outputs.
    IoError(std::io::Error),
    /// The document is not valid JSON or does not have the expected shape.
    MalformedDocument(String),
    /// A required field is absent (or `null`).
    ///
    /// `shape` is the position of the offending shape record, or `None` when
    /// the field belongs to the document itself.
    MissingField {
        field: &'static str,
        shape: Option<usize>,
    },
    /// The shape at the given position has an empty label string.
    EmptyLabel { shape: usize },
    /// The embedded image payload could not be decoded.
    ImageDecodeError(String),
    /// The resize factor is not a finite number greater than zero.
    InvalidScale(f64),
    /// The output format cannot represent the data (for example a vocabulary
    /// too large for a 16-bit mask image).
    UnsupportedFormat(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedDocument(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::ImageDecodeError(format!("invalid base64 payload: {}", err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::IoError(e),
            other => Error::ImageDecodeError(other.to_string()),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::MalformedDocument(s) => write!(f, "Malformed document: {}", s),
            Error::MissingField {
                field,
                shape: Some(shape),
            } => write!(f, "Missing field `{}` in shape {}", field, shape),
            Error::MissingField { field, shape: None } => {
                write!(f, "Missing field `{}` in document", field)
            }
            Error::EmptyLabel { shape } => write!(f, "Empty label in shape {}", shape),
            Error::ImageDecodeError(s) => write!(f, "Image decode error: {}", s),
            Error::InvalidScale(factor) => {
                write!(f, "Invalid resize factor {}: must be greater than 0", factor)
            }
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}
