// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Polygon rasterization onto the pixel grid.
//!
//! ## Inside test
//!
//! Every polygon is implicitly closed. A pixel `(x, y)` is tested at its
//! integer coordinates with an even-odd ray cast toward +x. An edge from
//! `(xi, yi)` to `(xj, yj)` is crossed when `(yi > y) != (yj > y)` and `x`
//! lies strictly left of the intersection. For an axis-aligned rectangle
//! `[x0, x1] × [y0, y1]` this selects exactly `[x0, x1) × [y0, y1)`: left and
//! top edges are inside, right and bottom edges are outside.
//!
//! Degenerate polygons (fewer than three points, zero area, self
//! intersections) are rasterized with the same predicate and may cover
//! nothing.
//!
//! ## Scan strategies
//!
//! [`RasterStrategy::FullGrid`] tests every pixel of the grid.
//! [`RasterStrategy::BoundingBox`] only tests pixels inside the polygon's
//! bounding box; no pixel outside it can pass the predicate, so both produce
//! identical coverage.

use crate::{
    Error, LabeledPolygon,
    mask::{Mask, MaskCompositor},
};
use rayon::prelude::*;
use std::{fmt, ops::Range, str::FromStr};

/// Which pixels are tested against each polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterStrategy {
    /// Test every pixel of the grid.
    FullGrid,
    /// Test only pixels within the polygon's bounding box.
    #[default]
    BoundingBox,
}

impl fmt::Display for RasterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterStrategy::FullGrid => write!(f, "full"),
            RasterStrategy::BoundingBox => write!(f, "bbox"),
        }
    }
}

impl FromStr for RasterStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "full-grid" | "fullgrid" => Ok(RasterStrategy::FullGrid),
            "bbox" | "bounding-box" | "boundingbox" => Ok(RasterStrategy::BoundingBox),
            other => Err(Error::InvalidParameters(format!(
                "unknown raster strategy '{}', expected 'bbox' or 'full'",
                other
            ))),
        }
    }
}

/// Horizontal run of inside pixels `[start, end)` on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub row: u32,
    pub start: u32,
    pub end: u32,
}

/// Pixels covered by one polygon, as row-ordered spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    spans: Vec<Span>,
}

impl Coverage {
    pub fn from_spans(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Total number of covered pixels.
    pub fn area(&self) -> usize {
        self.spans.iter().map(|s| (s.end - s.start) as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Even-odd test of point `(x, y)` against the implicitly closed `polygon`.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Pixel window `(columns, rows)` enclosing the polygon, clipped to the grid.
///
/// Padded by one pixel on each side so rounding in the edge intersection can
/// never push an inside pixel out of the window.
fn bounding_window(polygon: &[(f64, f64)], width: u32, height: u32) -> (Range<u32>, Range<u32>) {
    let (min_x, max_x, min_y, max_y) = polygon.iter().fold(
        (
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ),
        |(min_x, max_x, min_y, max_y), &(x, y)| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        },
    );

    let clip = |lo: f64, hi: f64, size: u32| -> Range<u32> {
        let start = (lo.floor() - 1.0).max(0.0);
        let end = (hi.floor() + 2.0).min(size as f64);
        if start < end {
            start as u32..end as u32
        } else {
            0..0
        }
    };

    (clip(min_x, max_x, width), clip(min_y, max_y, height))
}

/// Compute the pixels of a `width`×`height` grid covered by `polygon`.
pub fn polygon_coverage(
    polygon: &[(f64, f64)],
    width: u32,
    height: u32,
    strategy: RasterStrategy,
) -> Coverage {
    let (columns, rows) = match strategy {
        RasterStrategy::FullGrid => (0..width, 0..height),
        RasterStrategy::BoundingBox => bounding_window(polygon, width, height),
    };

    let mut spans = Vec::new();
    for y in rows {
        let py = y as f64;
        let mut run: Option<u32> = None;
        for x in columns.clone() {
            let inside = point_in_polygon(x as f64, py, polygon);
            match (inside, run) {
                (true, None) => run = Some(x),
                (false, Some(start)) => {
                    spans.push(Span {
                        row: y,
                        start,
                        end: x,
                    });
                    run = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run {
            spans.push(Span {
                row: y,
                start,
                end: columns.end,
            });
        }
    }

    Coverage { spans }
}

/// Rasterizes labeled polygons into a [`Mask`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    strategy: RasterStrategy,
    parallel: bool,
}

impl Rasterizer {
    pub fn new(strategy: RasterStrategy) -> Self {
        Self {
            strategy,
            parallel: false,
        }
    }

    /// Compute polygon coverages on the rayon pool. Stamping into the mask
    /// stays sequential in input order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn strategy(&self) -> RasterStrategy {
        self.strategy
    }

    /// Rasterize `polygons` in order onto a fresh `width`×`height` mask.
    ///
    /// Polygon coordinates must already be in grid pixels.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip(self, polygons), fields(polygons = polygons.len())))]
    pub fn rasterize(&self, width: u32, height: u32, polygons: &[LabeledPolygon]) -> Mask {
        let coverage = |polygon: &LabeledPolygon| {
            polygon_coverage(&polygon.points, width, height, self.strategy)
        };

        let coverages: Vec<Coverage> = if self.parallel {
            polygons.par_iter().map(coverage).collect()
        } else {
            polygons.iter().map(coverage).collect()
        };

        let mut compositor = MaskCompositor::new(width, height);
        for (polygon, covered) in polygons.iter().zip(&coverages) {
            if covered.is_empty() {
                log::debug!(
                    "Polygon with label {} ({} points) covers no pixels",
                    polygon.label_index,
                    polygon.points.len()
                );
            }
            compositor.stamp(polygon.label_index, covered);
        }

        compositor.into_mask()
    }
}
