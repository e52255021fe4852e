//! Scene objects: stable handles and capability traits.
//!
//! A scene object is anything that can draw itself. On top of that it may opt
//! into two more capabilities by overriding the accessor methods of
//! [`Drawable`]:
//!
//! - [`Positioned`]: a mutable logical position, used by movement effects.
//! - [`Contactable`]: point and collision geometry, used by contact layers.
//!
//! Objects live in the scene arena and are addressed by [`ObjectId`] handles
//! issued on insertion, never by reference identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geom::{Affine, Point};
use crate::render::{ProbeSurface, Surface};

/// Stable handle of a scene object. Issued by the scene, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that can render itself on a [`Surface`].
///
/// The surface already carries `layer ∘ member` transform when `draw` is
/// called, and the render pass restores the surface state afterwards.
pub trait Drawable {
    /// Draw in the object's own coordinates.
    ///
    /// # Errors
    ///
    /// Propagates [`SceneError::Surface`] from the drawing surface.
    fn draw(&self, surface: &mut dyn Surface) -> Result<(), SceneError>;

    /// The positioned capability, if the object has one.
    fn as_positioned(&self) -> Option<&dyn Positioned> {
        None
    }

    fn as_positioned_mut(&mut self) -> Option<&mut dyn Positioned> {
        None
    }

    /// The contact capability, if the object has one.
    fn as_contactable(&self) -> Option<&dyn Contactable> {
        None
    }
}

/// An object with a mutable logical position in its layer's coordinates.
pub trait Positioned {
    fn position(&self) -> Point;
    fn set_position(&mut self, position: Point);
}

/// Geometry contract of objects placed in a contact layer.
///
/// All points are in layer coordinates. `transform` (or the probe's
/// transform) is the member's own transform inside its layer.
pub trait Contactable: Positioned {
    /// Cheap conservative test. May accept points outside the silhouette but
    /// must never reject a point inside it.
    fn approximate_contains(&self, transform: &Affine, point: Point) -> bool;

    /// Exact test against the object's silhouette.
    fn precise_contains(&self, probe: &ProbeSurface, point: Point) -> bool;

    /// Representative points, before the member transform, sampled for
    /// pairwise collision.
    fn probe_points(&self) -> Vec<Point>;
}

/// A drawable built from a closure, for decorations that take no part in
/// contact or movement.
pub struct Sketch<F>(pub F);

impl<F> Drawable for Sketch<F>
where
    F: Fn(&mut dyn Surface) -> Result<(), SceneError>,
{
    fn draw(&self, surface: &mut dyn Surface) -> Result<(), SceneError> {
        (self.0)(surface)
    }
}
