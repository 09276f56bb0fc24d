// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! LabelMe annotation documents.
//!
//! The JSON written by the annotation tool is deserialized into loosely typed
//! raw records first, then resolved once into [`AnnotationDocument`] with
//! explicit required-field checks. Downstream stages only ever see the
//! resolved form.
//!
//! ```json
//! {
//!   "shapes": [
//!     { "label": "bee", "points": [[0, 0], [4, 0], [4, 4], [0, 4]] }
//!   ],
//!   "imageData": "iVBORw0KGgo..."
//! }
//! ```

use crate::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One drawn polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    /// Boundary vertices `(x, y)` in source image pixels. Order is
    /// significant and always holds at least one point.
    pub points: Vec<(f64, f64)>,
    /// Free-form class label.
    pub label: String,
    /// Drawing tool that produced the shape (`polygon`, `rectangle`, ...).
    pub shape_type: Option<String>,
    /// Instance grouping id assigned by the annotator.
    pub group_id: Option<i64>,
}

impl ShapeRecord {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            label: label.into(),
            shape_type: None,
            group_id: None,
        }
    }

    /// Returns the points multiplied by `factor`.
    pub fn scaled_points(&self, factor: f64) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|&(x, y)| (x * factor, y * factor))
            .collect()
    }
}

/// A parsed annotation document.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDocument {
    /// Shapes in drawing order. The order decides overlap precedence.
    pub shapes: Vec<ShapeRecord>,
    /// Base64 encoded image bytes.
    pub image_data: String,
    /// Annotation tool version.
    pub version: Option<String>,
    /// Path of the source image relative to the document.
    pub image_path: Option<String>,
    /// Image height declared by the annotation tool.
    pub image_height: Option<u32>,
    /// Image width declared by the annotation tool.
    pub image_width: Option<u32>,
}

// Metadata fields are informational: a value of an unexpected type reads as
// absent instead of rejecting the document.
#[derive(Deserialize)]
struct RawDocument {
    shapes: Option<Vec<RawShape>>,
    #[serde(rename = "imageData")]
    image_data: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    version: Option<String>,
    #[serde(rename = "imagePath", default, deserialize_with = "lenient_string")]
    image_path: Option<String>,
    #[serde(rename = "imageHeight", default, deserialize_with = "lenient_u32")]
    image_height: Option<u32>,
    #[serde(rename = "imageWidth", default, deserialize_with = "lenient_u32")]
    image_width: Option<u32>,
}

#[derive(Deserialize)]
struct RawShape {
    points: Option<Vec<[f64; 2]>>,
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    shape_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    group_id: Option<i64>,
}

/// Integer view of a JSON scalar: integral numbers (`480`, `480.0`) and
/// numeric strings (`"480"`).
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient<'de, D, T>(
    deserializer: D,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let converted = convert(&value);
        if converted.is_none() && !value.is_null() {
            log::warn!("Ignoring unexpected metadata value {}", value);
        }
        converted
    }))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    lenient(deserializer, |v| {
        integer_value(v).and_then(|i| u32::try_from(i).ok())
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    lenient(deserializer, integer_value)
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    lenient(deserializer, |v| v.as_str().map(str::to_string))
}

impl AnnotationDocument {
    pub fn new(shapes: Vec<ShapeRecord>, image_data: impl Into<String>) -> Self {
        Self {
            shapes,
            image_data: image_data.into(),
            version: None,
            image_path: None,
            image_height: None,
            image_width: None,
        }
    }

    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawDocument = serde_json::from_str(json)?;
        Self::resolve(raw)
    }

    /// Parse a document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        Self::resolve(raw)
    }

    /// Parse a document from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let raw: RawDocument = serde_json::from_reader(reader)?;
        Self::resolve(raw)
    }

    /// Read and parse a document from a JSON file.
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        Self::from_reader(reader)
    }

    /// Labels of every shape, in shape order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().map(|s| s.label.as_str())
    }

    fn resolve(raw: RawDocument) -> Result<Self, Error> {
        let raw_shapes = raw.shapes.ok_or(Error::MissingField {
            field: "shapes",
            shape: None,
        })?;

        let shapes = raw_shapes
            .into_iter()
            .enumerate()
            .map(|(index, shape)| resolve_shape(index, shape))
            .collect::<Result<Vec<_>, _>>()?;

        let image_data = raw.image_data.ok_or(Error::MissingField {
            field: "imageData",
            shape: None,
        })?;

        log::debug!(
            "Parsed annotation document with {} shapes ({} bytes of image data)",
            shapes.len(),
            image_data.len()
        );

        Ok(Self {
            shapes,
            image_data,
            version: raw.version,
            image_path: raw.image_path,
            image_height: raw.image_height,
            image_width: raw.image_width,
        })
    }
}

impl std::str::FromStr for AnnotationDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

fn resolve_shape(index: usize, raw: RawShape) -> Result<ShapeRecord, Error> {
    let points = raw.points.ok_or(Error::MissingField {
        field: "points",
        shape: Some(index),
    })?;
    let label = raw.label.ok_or(Error::MissingField {
        field: "label",
        shape: Some(index),
    })?;

    if points.is_empty() {
        return Err(Error::MalformedDocument(format!(
            "shape {} ({:?}) has no points",
            index, label
        )));
    }

    Ok(ShapeRecord {
        points: points.into_iter().map(|[x, y]| (x, y)).collect(),
        label,
        shape_type: raw.shape_type,
        group_id: raw.group_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let doc = AnnotationDocument::from_json(
            r#"{
                "shapes": [
                    {"label": "bee", "points": [[0, 0], [4, 0], [4, 4], [0, 4]]},
                    {"label": "flower", "points": [[2.5, 2], [6, 2], [6, 6.5]]}
                ],
                "imageData": "AAAA"
            }"#,
        )
        .unwrap();

        assert_eq!(doc.shapes.len(), 2);
        assert_eq!(doc.shapes[0].label, "bee");
        assert_eq!(doc.shapes[0].points[1], (4.0, 0.0));
        assert_eq!(doc.shapes[1].points[0], (2.5, 2.0));
        assert_eq!(doc.image_data, "AAAA");
        assert_eq!(doc.labels().collect::<Vec<_>>(), vec!["bee", "flower"]);
    }

    #[test]
    fn test_parse_full_labelme_document() {
        let doc: AnnotationDocument = r#"{
            "version": "5.2.1",
            "flags": {},
            "shapes": [
                {
                    "label": "cell",
                    "points": [[1, 1], [3, 1], [3, 3]],
                    "group_id": null,
                    "description": "",
                    "shape_type": "polygon",
                    "flags": {}
                }
            ],
            "imagePath": "cell.png",
            "imageData": "AAAA",
            "imageHeight": 480,
            "imageWidth": 640
        }"#
        .parse()
        .unwrap();

        assert_eq!(doc.version.as_deref(), Some("5.2.1"));
        assert_eq!(doc.image_path.as_deref(), Some("cell.png"));
        assert_eq!(doc.image_height, Some(480));
        assert_eq!(doc.image_width, Some(640));
        assert_eq!(doc.shapes[0].shape_type.as_deref(), Some("polygon"));
        assert_eq!(doc.shapes[0].group_id, None);
    }

    #[test]
    fn test_metadata_types_are_lenient() {
        let doc = AnnotationDocument::from_json(
            r#"{
                "version": 5,
                "shapes": [
                    {"label": "a", "points": [[0, 0]], "group_id": "1", "shape_type": 3},
                    {"label": "b", "points": [[0, 0]], "group_id": 2.0},
                    {"label": "c", "points": [[0, 0]], "group_id": {"id": 3}}
                ],
                "imagePath": null,
                "imageData": "AAAA",
                "imageHeight": 480.0,
                "imageWidth": "640"
            }"#,
        )
        .unwrap();

        assert_eq!(doc.image_height, Some(480));
        assert_eq!(doc.image_width, Some(640));
        assert_eq!(doc.version, None);
        assert_eq!(doc.image_path, None);
        assert_eq!(doc.shapes[0].group_id, Some(1));
        assert_eq!(doc.shapes[0].shape_type, None);
        assert_eq!(doc.shapes[1].group_id, Some(2));
        assert_eq!(doc.shapes[2].group_id, None);

        let doc = AnnotationDocument::from_json(
            r#"{"shapes": [], "imageData": "", "imageHeight": -4, "imageWidth": 12.5}"#,
        )
        .unwrap();
        assert_eq!((doc.image_height, doc.image_width), (None, None));
    }

    #[test]
    fn test_shape_order_preserved() {
        let doc = AnnotationDocument::from_json(
            r#"{"shapes": [
                {"label": "z", "points": [[0, 0]]},
                {"label": "a", "points": [[0, 0]]},
                {"label": "m", "points": [[0, 0]]}
            ], "imageData": ""}"#,
        )
        .unwrap();
        assert_eq!(doc.labels().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_missing_shapes() {
        let err = AnnotationDocument::from_json(r#"{"imageData": "AAAA"}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "shapes",
                shape: None
            }
        ));
    }

    #[test]
    fn test_missing_image_data() {
        let err = AnnotationDocument::from_json(r#"{"shapes": []}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "imageData",
                shape: None
            }
        ));

        // LabelMe writes null when the image is stored next to the document.
        let err = AnnotationDocument::from_json(r#"{"shapes": [], "imageData": null}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "imageData",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_shape_fields() {
        let err = AnnotationDocument::from_json(
            r#"{"shapes": [{"label": "a", "points": [[0, 0]]}, {"points": [[0, 0]]}], "imageData": ""}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "label",
                shape: Some(1)
            }
        ));

        let err = AnnotationDocument::from_json(r#"{"shapes": [{"label": "a"}], "imageData": ""}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "points",
                shape: Some(0)
            }
        ));
    }

    #[test]
    fn test_malformed_documents() {
        for json in [
            "not json",
            "[]",
            r#"{"shapes": {}, "imageData": ""}"#,
            r#"{"shapes": [{"label": "a", "points": [[0, 0, 0]]}], "imageData": ""}"#,
            r#"{"shapes": [{"label": "a", "points": [["x", 0]]}], "imageData": ""}"#,
            r#"{"shapes": [{"label": 7, "points": [[0, 0]]}], "imageData": ""}"#,
            r#"{"shapes": [{"label": "a", "points": []}], "imageData": ""}"#,
        ] {
            let err = AnnotationDocument::from_json(json).unwrap_err();
            assert!(
                matches!(err, Error::MalformedDocument(_)),
                "{} -> {:?}",
                json,
                err
            );
        }
    }

    #[test]
    fn test_scaled_points() {
        let shape = ShapeRecord::new("a", vec![(4.0, 8.0), (2.0, 1.0)]);
        assert_eq!(shape.scaled_points(0.5), vec![(2.0, 4.0), (1.0, 0.5)]);
    }
}
