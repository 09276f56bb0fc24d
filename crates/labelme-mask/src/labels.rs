// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Label vocabulary resolution.
//!
//! Class indices are derived from the *set* of label strings only: the set is
//! sorted, `"Background"` is prepended at index 0, and every shape maps to
//! `1 + position` of its label in the sorted set. Shape order never affects
//! the assignment.

use crate::{Error, ShapeRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the synthetic class at mask index 0.
pub const BACKGROUND: &str = "Background";

/// Ordered mapping from mask value to class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    names: Vec<String>,
}

impl LabelVocabulary {
    /// All class names, `"Background"` first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of classes including background. Never zero.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false since background is always present.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for a mask value.
    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Mask value for a class name.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Largest mask value any pixel can hold.
    pub fn max_index(&self) -> u32 {
        (self.names.len() - 1) as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.as_str()))
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            names: vec![BACKGROUND.to_string()],
        }
    }
}

/// Polygon vertices paired with the class index they are stamped with.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPolygon {
    pub points: Vec<(f64, f64)>,
    /// 1-based class index, never 0.
    pub label_index: u32,
}

impl LabeledPolygon {
    pub fn new(points: Vec<(f64, f64)>, label_index: u32) -> Self {
        Self {
            points,
            label_index,
        }
    }

    /// Copy with every vertex multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|&(x, y)| (x * factor, y * factor))
                .collect(),
            label_index: self.label_index,
        }
    }
}

/// Resolve raw label strings into a vocabulary and one index per label.
///
/// Indices are returned in input order and cover the dense range
/// `1..=vocabulary.max_index()`. An empty label string is rejected with
/// [`Error::EmptyLabel`] carrying its input position.
pub fn resolve_labels<'a, I>(labels: I) -> Result<(LabelVocabulary, Vec<u32>), Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let labels: Vec<&str> = labels.into_iter().collect();

    if let Some(shape) = labels.iter().position(|l| l.is_empty()) {
        return Err(Error::EmptyLabel { shape });
    }

    let unique: BTreeSet<&str> = labels.iter().copied().collect();
    let lookup: BTreeMap<&str, u32> = unique
        .iter()
        .enumerate()
        .map(|(position, &label)| (label, position as u32 + 1))
        .collect();

    let indices = labels.iter().map(|label| lookup[label]).collect();

    let mut names = Vec::with_capacity(unique.len() + 1);
    names.push(BACKGROUND.to_string());
    names.extend(unique.into_iter().map(str::to_string));

    Ok((LabelVocabulary { names }, indices))
}

/// Resolve the labels of `shapes` and pair each shape with its index.
pub fn label_shapes(
    shapes: &[ShapeRecord],
) -> Result<(LabelVocabulary, Vec<LabeledPolygon>), Error> {
    let (vocabulary, indices) = resolve_labels(shapes.iter().map(|s| s.label.as_str()))?;

    let polygons = shapes
        .iter()
        .zip(indices)
        .map(|(shape, index)| LabeledPolygon::new(shape.points.clone(), index))
        .collect();

    log::debug!(
        "Resolved {} shapes into {} classes: {:?}",
        shapes.len(),
        vocabulary.len(),
        vocabulary.names()
    );

    Ok((vocabulary, polygons))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sorted_with_background() {
        let (vocab, indices) = resolve_labels(["flower", "bee", "flower", "ant"]).unwrap();
        assert_eq!(vocab.names(), &["Background", "ant", "bee", "flower"]);
        assert_eq!(indices, vec![3, 2, 3, 1]);
        assert_eq!(vocab.max_index(), 3);
    }

    #[test]
    fn test_resolve_empty_input() {
        let (vocab, indices) = resolve_labels(std::iter::empty()).unwrap();
        assert_eq!(vocab, LabelVocabulary::default());
        assert_eq!(vocab.names(), &["Background"]);
        assert!(indices.is_empty());
    }

    #[test]
    fn test_resolve_order_independent() {
        let (a, ai) = resolve_labels(["cat", "dog", "bird", "dog"]).unwrap();
        let (b, bi) = resolve_labels(["dog", "bird", "dog", "cat"]).unwrap();
        assert_eq!(a, b);

        // Same label always maps to the same index regardless of position.
        assert_eq!(ai[1], bi[0]);
        assert_eq!(ai[0], bi[3]);
        assert_eq!(ai[2], bi[1]);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let labels = ["b", "a", "c", "a"];
        assert_eq!(
            resolve_labels(labels).unwrap(),
            resolve_labels(labels).unwrap()
        );
    }

    #[test]
    fn test_resolve_dense_range() {
        let labels = ["e", "b", "e", "d", "a", "b"];
        let (vocab, indices) = resolve_labels(labels).unwrap();
        let mut seen: Vec<u32> = indices.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, (1..=vocab.max_index()).collect::<Vec<_>>());
        assert!(indices.iter().all(|&i| i != 0));
    }

    #[test]
    fn test_resolve_byte_order() {
        // Uppercase sorts before lowercase in plain string order.
        let (vocab, _) = resolve_labels(["bee", "Zebra", "apple"]).unwrap();
        assert_eq!(vocab.names(), &["Background", "Zebra", "apple", "bee"]);
    }

    #[test]
    fn test_resolve_empty_label() {
        let err = resolve_labels(["a", "", "b"]).unwrap_err();
        assert!(matches!(err, Error::EmptyLabel { shape: 1 }));
    }

    #[test]
    fn test_vocabulary_lookup() {
        let (vocab, _) = resolve_labels(["bee", "flower"]).unwrap();
        assert_eq!(vocab.name(0), Some("Background"));
        assert_eq!(vocab.name(2), Some("flower"));
        assert_eq!(vocab.name(3), None);
        assert_eq!(vocab.index_of("bee"), Some(1));
        assert_eq!(vocab.index_of("wasp"), None);
        assert_eq!(
            serde_json::to_string(&vocab).unwrap(),
            r#"["Background","bee","flower"]"#
        );
    }

    #[test]
    fn test_label_shapes() {
        let shapes = vec![
            ShapeRecord::new("flower", vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]),
            ShapeRecord::new("bee", vec![(1.0, 1.0)]),
        ];
        let (vocab, polygons) = label_shapes(&shapes).unwrap();
        assert_eq!(vocab.names(), &["Background", "bee", "flower"]);
        assert_eq!(polygons[0].label_index, 2);
        assert_eq!(polygons[0].points, shapes[0].points);
        assert_eq!(polygons[1].label_index, 1);
        assert_eq!(polygons[0].scaled(0.5).points[1], (1.0, 0.0));
    }
}
