//! Core geometric types shared by the index and the ordered sync

use serde::{Deserialize, Serialize};

/// A 2D point in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding box representing the spatial extent of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest axis-aligned box containing all the points
    pub fn from_points(points: &[Point]) -> Option<BoundingBox> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// A point expressed as a fraction of a container's width and height.
///
/// Values are not clamped: elements hanging outside their container produce
/// coordinates below 0 or above 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint {
    pub nx: f64,
    pub ny: f64,
}

impl NormalizedPoint {
    pub fn new(nx: f64, ny: f64) -> Self {
        Self { nx, ny }
    }

    /// Euclidean distance in normalized space
    pub fn distance_to(&self, other: &NormalizedPoint) -> f64 {
        let dx = self.nx - other.nx;
        let dy = self.ny - other.ny;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.nx.is_finite() && self.ny.is_finite()
    }
}

/// An element's extent expressed as a fraction of its container's extent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedSize {
    pub nw: f64,
    pub nh: f64,
}
