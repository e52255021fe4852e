//! Plane geometry: points, axis-aligned rectangles and 2D affine transforms.
//!
//! [`Affine`] stores the six coefficients `(a, b, c, d, e, f)` of the
//! homogeneous matrix
//!
//! ```text
//! [ a  c  e ]
//! [ b  d  f ]
//! [ 0  0  1 ]
//! ```
//!
//! in the same order a 2D canvas `setTransform(a, b, c, d, e, f)` expects.
//! `translate`, `scale` and `rotate` post-multiply: the new operation is
//! applied in the transform's local coordinates, before the existing ones.
//!
//! Rotation sign: a positive angle turns the x axis towards the y axis, so
//! `rotate(π/2)` maps `(1, 0)` to `(0, 1)`. With the device convention of y
//! growing downwards this looks clockwise on screen. Effects and gestures rely
//! on this exact sign.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

use crate::consts::DETERMINANT_EPSILON;
use crate::error::SceneError;

/// A point (or vector) in device, layer or object space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin `(0, 0)`.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Displacement from `self` to `other`.
    #[must_use]
    pub fn vector_to(self, other: Self) -> Self {
        Self { x: other.x - self.x, y: other.y - self.y }
    }

    #[must_use]
    pub fn square_distance(self, other: Self) -> f64 {
        (other.x - self.x).powi(2) + (other.y - self.y).powi(2)
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.square_distance(other).sqrt()
    }

    /// Linear interpolation: `alpha = 0` yields `self`, `alpha = 1` yields `to`.
    #[must_use]
    pub fn lerp(self, to: Self, alpha: f64) -> Self {
        Self {
            x: self.x * (1.0 - alpha) + to.x * alpha,
            y: self.y * (1.0 - alpha) + to.y * alpha,
        }
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

/// Axis-aligned rectangle. `min`/`max` are normalized from the two corners it
/// was built from; `from`/`to` keep the original corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub from: Point,
    pub to: Point,
    pub min: Point,
    pub max: Point,
}

impl Rect {
    #[must_use]
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            min: Point::new(from.x.min(to.x), from.y.min(to.y)),
            max: Point::new(from.x.max(to.x), from.y.max(to.y)),
        }
    }

    /// Rectangle anchored at the origin with the given size.
    #[must_use]
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Point::ORIGIN, Point::new(width, height))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Whether `point` lies inside or on the border.
    #[must_use]
    pub fn inside(&self, point: Point) -> bool {
        self.min.x <= point.x && point.x <= self.max.x && self.min.y <= point.y && point.y <= self.max.y
    }

    /// Whether `other` lies entirely within `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.inside(other.min) && self.inside(other.max)
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x && self.min.y < other.max.y && self.max.y > other.min.y
    }

    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self::new(
            Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        )
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn bounding(&self, other: &Self) -> Self {
        Self::new(
            Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }

    #[must_use]
    pub fn translate(&self, v: Point) -> Self {
        Self::new(self.min + v, self.max + v)
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(
            Point::new(self.min.x * factor, self.min.y * factor),
            Point::new(self.max.x * factor, self.max.y * factor),
        )
    }
}

/// Immutable 2D affine transform. All operations return a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Self = Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    #[must_use]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[must_use]
    pub fn from_coefficients([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The coefficients in canvas order `[a, b, c, d, e, f]`.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Pure translation.
    #[must_use]
    pub fn translation(v: Point) -> Self {
        Self::IDENTITY.translate(v)
    }

    /// Pure rotation.
    #[must_use]
    pub fn rotation(radians: f64) -> Self {
        Self::IDENTITY.rotate(radians)
    }

    /// Pure scale.
    #[must_use]
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::IDENTITY.scale(sx, sy)
    }

    #[must_use]
    pub fn translate(&self, v: Point) -> Self {
        self.compose(&Self::new(1.0, 0.0, 0.0, 1.0, v.x, v.y))
    }

    #[must_use]
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        self.compose(&Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0))
    }

    #[must_use]
    pub fn rotate(&self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        self.compose(&Self::new(cos, sin, -sin, cos, 0.0, 0.0))
    }

    /// `self ∘ other`: `other` is applied to a point first, then `self`.
    #[must_use]
    pub fn compose(&self, m: &Self) -> Self {
        Self {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.c * self.b
    }

    /// Inverse transform.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SingularTransform`] when the determinant is zero
    /// (e.g. after a zero scale) or not finite.
    pub fn inverse(&self) -> Result<Self, SceneError> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < DETERMINANT_EPSILON {
            return Err(SceneError::SingularTransform { determinant: det });
        }
        let Self { a, b, c, d, e, f } = *self;
        Ok(Self {
            a: d / det,
            b: -b / det,
            c: -c / det,
            d: a / det,
            e: (c * f - d * e) / det,
            f: (b * e - a * f) / det,
        })
    }

    /// Map a point through the transform.
    #[must_use]
    pub fn transform(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }
}

/// Eased progress used by movement effects:
/// `1 - sin(2πα) / (2πα)`, with `ease(0) = 0`.
#[must_use]
pub fn ease(alpha: f64) -> f64 {
    if alpha == 0.0 {
        return 0.0;
    }
    let turn = 2.0 * std::f64::consts::PI * alpha;
    1.0 - turn.sin() / turn
}
