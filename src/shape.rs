//! Built-in contactable shapes.
//!
//! A [`Shape`] is an [`Outline`] placed at a logical position, plus a
//! [`Style`]. Shapes serialize to JSON so hosts can describe scenes as data:
//!
//! ```json
//! { "position": { "x": 100, "y": 80 },
//!   "outline": { "kind": "rect", "width": 40, "height": 20 },
//!   "style": { "fill": "tomato" } }
//! ```
//!
//! Rectangles and ellipses are centred on the position; polygon vertices are
//! relative to it.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::object::{Contactable, Drawable, Positioned};
use crate::render::{ProbeSurface, Surface};

/// Segments used to approximate an ellipse outline for strokes and probes.
const ELLIPSE_SEGMENTS: u32 = 32;

/// Probe points sampled on an ellipse for collision tests.
const ELLIPSE_PROBES: u32 = 8;

const DEFAULT_FILL: &str = "#D94B4B";

/// Silhouette of a shape, relative to its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outline {
    /// Axis-aligned rectangle centred on the position.
    Rect { width: f64, height: f64 },
    /// Axis-aligned ellipse centred on the position.
    Ellipse { radius_x: f64, radius_y: f64 },
    /// Closed polygon; vertices are offsets from the position.
    Polygon { vertices: Vec<Point> },
}

/// Fill and stroke styles as CSS color strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default = "default_fill")]
    pub fill: Option<String>,
    #[serde(default)]
    pub stroke: Option<String>,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

#[allow(clippy::unnecessary_wraps)]
fn default_fill() -> Option<String> {
    Some(DEFAULT_FILL.to_owned())
}

fn default_line_width() -> f64 {
    1.0
}

impl Default for Style {
    fn default() -> Self {
        Self { fill: default_fill(), stroke: None, line_width: default_line_width() }
    }
}

/// A positioned, styled outline that takes part in contact detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub position: Point,
    pub outline: Outline,
    #[serde(default)]
    pub style: Style,
}

impl Shape {
    #[must_use]
    pub fn rect(center: Point, width: f64, height: f64) -> Self {
        Self { position: center, outline: Outline::Rect { width, height }, style: Style::default() }
    }

    #[must_use]
    pub fn ellipse(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self { position: center, outline: Outline::Ellipse { radius_x, radius_y }, style: Style::default() }
    }

    #[must_use]
    pub fn polygon(position: Point, vertices: Vec<Point>) -> Self {
        Self { position, outline: Outline::Polygon { vertices }, style: Style::default() }
    }

    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.style.fill = Some(fill.into());
        self
    }

    #[must_use]
    pub fn with_stroke(mut self, stroke: impl Into<String>, line_width: f64) -> Self {
        self.style.stroke = Some(stroke.into());
        self.style.line_width = line_width;
        self
    }

    /// Parse a shape from its JSON description.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] if the JSON does not describe a shape.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        serde_json::from_str(json).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Bounding box before the member transform.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let p = self.position;
        match &self.outline {
            Outline::Rect { width, height } => Rect::new(
                Point::new(p.x - width / 2.0, p.y - height / 2.0),
                Point::new(p.x + width / 2.0, p.y + height / 2.0),
            ),
            Outline::Ellipse { radius_x, radius_y } => {
                Rect::new(Point::new(p.x - radius_x, p.y - radius_y), Point::new(p.x + radius_x, p.y + radius_y))
            }
            Outline::Polygon { vertices } => vertices
                .iter()
                .map(|&v| Rect::new(p + v, p + v))
                .reduce(|a, b| a.bounding(&b))
                .unwrap_or_else(|| Rect::new(p, p)),
        }
    }

    /// Outline as absolute vertices. Ellipses are sampled.
    fn vertices(&self) -> Vec<Point> {
        let p = self.position;
        match &self.outline {
            Outline::Rect { .. } => {
                let b = self.bounds();
                vec![b.min, Point::new(b.max.x, b.min.y), b.max, Point::new(b.min.x, b.max.y)]
            }
            Outline::Ellipse { radius_x, radius_y } => ellipse_points(p, *radius_x, *radius_y, ELLIPSE_SEGMENTS),
            Outline::Polygon { vertices } => vertices.iter().map(|&v| p + v).collect(),
        }
    }
}

fn ellipse_points(center: Point, radius_x: f64, radius_y: f64, count: u32) -> Vec<Point> {
    (0..count)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(count);
            Point::new(center.x + radius_x * angle.cos(), center.y + radius_y * angle.sin())
        })
        .collect()
}

fn with_midpoints(vertices: &[Point]) -> Vec<Point> {
    let mut points = Vec::with_capacity(vertices.len() * 2);
    for (i, &a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        points.push(a);
        points.push(a.lerp(b, 0.5));
    }
    points
}

impl Drawable for Shape {
    fn draw(&self, surface: &mut dyn Surface) -> Result<(), SceneError> {
        if let Some(fill) = &self.style.fill {
            match &self.outline {
                Outline::Ellipse { radius_x, radius_y } => {
                    surface.fill_ellipse(self.position, *radius_x, *radius_y, fill)?;
                }
                Outline::Rect { .. } => surface.fill_rect(&self.bounds(), fill),
                Outline::Polygon { .. } => surface.fill_polygon(&self.vertices(), fill),
            }
        }
        if let Some(stroke) = &self.style.stroke {
            surface.stroke_polygon(&self.vertices(), stroke, self.style.line_width);
        }
        Ok(())
    }

    fn as_positioned(&self) -> Option<&dyn Positioned> {
        Some(self)
    }

    fn as_positioned_mut(&mut self) -> Option<&mut dyn Positioned> {
        Some(self)
    }

    fn as_contactable(&self) -> Option<&dyn Contactable> {
        Some(self)
    }
}

impl Positioned for Shape {
    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }
}

impl Contactable for Shape {
    /// Bounding box of the transformed bounds.
    fn approximate_contains(&self, transform: &Affine, point: Point) -> bool {
        let b = self.bounds();
        let corners = [b.min, Point::new(b.max.x, b.min.y), b.max, Point::new(b.min.x, b.max.y)];
        corners
            .iter()
            .map(|&c| {
                let t = transform.transform(c);
                Rect::new(t, t)
            })
            .reduce(|a, b| a.bounding(&b))
            .is_some_and(|bounds| bounds.inside(point))
    }

    fn precise_contains(&self, probe: &ProbeSurface, point: Point) -> bool {
        match &self.outline {
            Outline::Rect { .. } => probe.is_point_in_rect(&self.bounds(), point),
            Outline::Ellipse { radius_x, radius_y } => {
                probe.is_point_in_ellipse(self.position, *radius_x, *radius_y, point)
            }
            Outline::Polygon { .. } => probe.is_point_in_polygon(&self.vertices(), point),
        }
    }

    fn probe_points(&self) -> Vec<Point> {
        match &self.outline {
            Outline::Ellipse { radius_x, radius_y } => {
                ellipse_points(self.position, *radius_x, *radius_y, ELLIPSE_PROBES)
            }
            Outline::Rect { .. } | Outline::Polygon { .. } => with_midpoints(&self.vertices()),
        }
    }
}
