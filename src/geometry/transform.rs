//! Affine transforms for mapping between document and container space.
//!
//! ## Matrix Convention
//!
//! Transforms use the SVG `matrix(a, b, c, d, e, f)` layout, which is also the
//! row-major `[[a, c, e], [b, d, f]]` form design hosts report as an element's
//! absolute transform:
//!
//! ```text
//! x' = a * x + c * y + e
//! y' = b * x + d * y + f
//! ```
//!
//! Rotation follows the SVG convention: clockwise positive angles, in degrees,
//! with the Y axis pointing down.

use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, Point};

/// Determinant magnitude below which a transform is treated as non-invertible
pub const SINGULAR_EPSILON: f64 = 1e-9;

/// A 2D affine transformation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Clockwise rotation around the origin
    pub fn rotate(angle_degrees: f64) -> Self {
        let radians = angle_degrees.to_radians();
        let (sin_a, cos_a) = radians.sin_cos();
        // [cos  -sin] [x]
        // [sin   cos] [y]
        Self::new(cos_a, sin_a, -sin_a, cos_a, 0.0, 0.0)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Compose two transforms: the result applies `other` first, then `self`
    pub fn then_apply_to(&self, other: &Transform) -> Transform {
        Transform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Invert the transform.
    ///
    /// Returns `None` when the determinant magnitude is below
    /// [`SINGULAR_EPSILON`] (e.g. a container scaled to zero width).
    pub fn inverse(&self) -> Option<Transform> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Transform {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            e: (self.c * self.f - self.d * self.e) * inv_det,
            f: (self.b * self.e - self.a * self.f) * inv_det,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point {
            x: self.a * point.x + self.c * point.y + self.e,
            y: self.b * point.x + self.d * point.y + self.f,
        }
    }

    /// Transform a local `width x height` box using the loose-bounds approach:
    /// map the 4 corners and take their axis-aligned bounding box.
    pub fn apply_to_extent(&self, width: f64, height: f64) -> BoundingBox {
        let corners = [
            self.apply(Point::new(0.0, 0.0)),
            self.apply(Point::new(width, 0.0)),
            self.apply(Point::new(0.0, height)),
            self.apply(Point::new(width, height)),
        ];
        BoundingBox::from_points(&corners).unwrap_or_default()
    }
}
