//! Rendering: the drawing-surface contract and the per-frame render pass.
//!
//! [`Surface`] is the only thing the core knows about pixels. The browser
//! implementation lives in [`crate::web`]; tests use a recording double.
//!
//! The render pass clears the surface, then paints every enabled layer back to
//! front and every member in insertion order, with `layer ∘ member` as the
//! current transform. Each layer and each member is wrapped in save/restore so
//! no member can leak context state to its siblings, even when its draw call
//! fails.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::scene::Scene;

/// 2D drawing context used by the render pass and by drawables.
pub trait Surface {
    /// Surface size in device pixels.
    fn size(&self) -> (f64, f64);

    fn save(&mut self);

    fn restore(&mut self);

    /// Replace the current transform.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Surface`] if the backend rejects the call.
    fn set_transform(&mut self, m: &Affine) -> Result<(), SceneError>;

    /// Post-multiply the current transform by `m`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Surface`] if the backend rejects the call.
    fn transform(&mut self, m: &Affine) -> Result<(), SceneError>;

    fn fill_rect(&mut self, rect: &Rect, style: &str);

    fn fill_polygon(&mut self, points: &[Point], style: &str);

    fn stroke_polygon(&mut self, points: &[Point], style: &str, line_width: f64);

    /// Fill an axis-aligned ellipse.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Surface`] for negative radii or backend failures.
    fn fill_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64, style: &str) -> Result<(), SceneError>;
}

/// Off-screen probe used by the precise phase of point containment.
///
/// It plays the role of a 1×1 canvas whose transform is set to a member's
/// transform: geometry is given in the member's own coordinates and the
/// queried point in layer coordinates, exactly as `isPointInPath` would take
/// them. A singular transform contains nothing.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSurface {
    transform: Affine,
    inverse: Option<Affine>,
}

impl ProbeSurface {
    #[must_use]
    pub fn new(transform: Affine) -> Self {
        let inverse = match transform.inverse() {
            Ok(inverse) => Some(inverse),
            Err(err) => {
                tracing::trace!(%err, "probe transform is singular");
                None
            }
        };
        Self { transform, inverse }
    }

    #[must_use]
    pub fn transform(&self) -> &Affine {
        &self.transform
    }

    /// `point` mapped back into the probe's local coordinates.
    #[must_use]
    pub fn local(&self, point: Point) -> Option<Point> {
        self.inverse.map(|inverse| inverse.transform(point))
    }

    /// Border-inclusive rectangle test.
    #[must_use]
    pub fn is_point_in_rect(&self, rect: &Rect, point: Point) -> bool {
        self.local(point).is_some_and(|p| rect.inside(p))
    }

    /// Border-inclusive axis-aligned ellipse test.
    #[must_use]
    pub fn is_point_in_ellipse(&self, center: Point, radius_x: f64, radius_y: f64, point: Point) -> bool {
        if radius_x <= 0.0 || radius_y <= 0.0 {
            return false;
        }
        self.local(point).is_some_and(|p| {
            let dx = (p.x - center.x) / radius_x;
            let dy = (p.y - center.y) / radius_y;
            dx * dx + dy * dy <= 1.0
        })
    }

    /// Polygon test with the non-zero winding rule (the canvas default).
    #[must_use]
    pub fn is_point_in_polygon(&self, vertices: &[Point], point: Point) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        self.local(point).is_some_and(|p| winding_number(vertices, p) != 0)
    }
}

fn winding_number(vertices: &[Point], p: Point) -> i32 {
    let mut winding = 0;
    for (i, &a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let side = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Run `body` between `save` and `restore`, restoring even when it fails.
fn isolated<F>(surface: &mut dyn Surface, body: F) -> Result<(), SceneError>
where
    F: FnOnce(&mut dyn Surface) -> Result<(), SceneError>,
{
    surface.save();
    let result = body(surface);
    surface.restore();
    result
}

/// Clear the surface and paint every enabled layer.
///
/// # Errors
///
/// Returns the first [`SceneError::Surface`] raised by the surface or by a
/// member's draw call. The surface state is balanced either way.
pub fn render(surface: &mut dyn Surface, scene: &Scene, background: &str) -> Result<(), SceneError> {
    let (width, height) = surface.size();
    isolated(surface, |s| {
        s.set_transform(&Affine::IDENTITY)?;
        s.fill_rect(&Rect::from_size(width, height), background);
        Ok(())
    })?;

    for (_, layer) in scene.enabled_layers() {
        isolated(surface, |s| {
            s.set_transform(layer.transform())?;
            for &id in layer.members() {
                let Some(object) = scene.drawable(id) else {
                    continue;
                };
                let member_transform = layer.member_transform(id).unwrap_or(Affine::IDENTITY);
                isolated(s, |s| {
                    s.transform(&member_transform)?;
                    object.draw(s)
                })?;
            }
            Ok(())
        })?;
    }
    Ok(())
}
