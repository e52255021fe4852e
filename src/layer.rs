//! Layers: ordered members with per-member transforms and one layer transform.
//!
//! A [`Layer`] owns the paint order of its members (insertion order, back to
//! front) and the mapping from member to member transform. Every member has
//! exactly one transform entry; `add` and `remove` keep the two in step.
//!
//! The layer transform maps layer coordinates to device coordinates. Its
//! inverse is computed lazily and cached until the next mutation.
//!
//! A layer built with [`LayerKind::Contact`] also answers point-contact and
//! collision queries over its contactable members, using a two-phase test:
//! a cheap approximate containment check first, and the precise silhouette
//! test only for members that pass it.

#[cfg(test)]
#[path = "layer_test.rs"]
mod layer_test;

use std::cell::Cell;
use std::collections::HashMap;

use crate::contact::Contact;
use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::object::{Contactable, Drawable, ObjectId};
use crate::render::ProbeSurface;

/// Whether a layer takes part in contact and collision queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerKind {
    /// Paint only.
    Plain,
    /// Paint and answer contact/collision queries.
    #[default]
    Contact,
}

/// Lookup of live objects by handle, provided by the scene arena.
pub trait ObjectLookup {
    fn lookup(&self, id: ObjectId) -> Option<&dyn Drawable>;
}

#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    transform: Affine,
    inverse: Cell<Option<Affine>>,
    members: Vec<ObjectId>,
    transforms: HashMap<ObjectId, Affine>,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new(LayerKind::default())
    }
}

impl Layer {
    #[must_use]
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            transform: Affine::IDENTITY,
            inverse: Cell::new(Some(Affine::IDENTITY)),
            members: Vec::new(),
            transforms: HashMap::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    // --- Membership ---

    /// Members in paint order, back to front.
    #[must_use]
    pub fn members(&self) -> &[ObjectId] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.transforms.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Append `id` on top with an identity transform. Returns `false` if it
    /// was already a member, in which case nothing changes.
    pub fn add(&mut self, id: ObjectId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        self.transforms.insert(id, Affine::IDENTITY);
        true
    }

    /// Remove `id` and its transform. Returns `false` if it was not a member.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        if self.transforms.remove(&id).is_none() {
            return false;
        }
        self.members.retain(|&m| m != id);
        true
    }

    /// Move `id` to the end of the paint order. Transforms are untouched.
    pub fn bring_to_top(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.position_of(id) else {
            return false;
        };
        let member = self.members.remove(index);
        self.members.push(member);
        true
    }

    /// Move `id` to the start of the paint order. Transforms are untouched.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.position_of(id) else {
            return false;
        };
        let member = self.members.remove(index);
        self.members.insert(0, member);
        true
    }

    fn position_of(&self, id: ObjectId) -> Option<usize> {
        self.members.iter().position(|&m| m == id)
    }

    // --- Member transforms ---

    #[must_use]
    pub fn member_transform(&self, id: ObjectId) -> Option<Affine> {
        self.transforms.get(&id).copied()
    }

    pub(crate) fn member_transform_mut(&mut self, id: ObjectId) -> Option<&mut Affine> {
        self.transforms.get_mut(&id)
    }

    /// Replace a member's transform. Returns `false` if `id` is not a member.
    pub fn set_member_transform(&mut self, id: ObjectId, m: Affine) -> bool {
        match self.transforms.get_mut(&id) {
            Some(t) => {
                *t = m;
                true
            }
            None => false,
        }
    }

    /// Post-multiply a member's transform by `m`. Returns `false` if `id` is
    /// not a member.
    pub fn accumulate_member_transform(&mut self, id: ObjectId, m: &Affine) -> bool {
        match self.transforms.get_mut(&id) {
            Some(t) => {
                *t = t.compose(m);
                true
            }
            None => false,
        }
    }

    // --- Layer transform ---

    #[must_use]
    pub fn transform(&self) -> &Affine {
        &self.transform
    }

    pub fn set_transform(&mut self, m: Affine) {
        self.transform = m;
        self.inverse.set(None);
    }

    /// Post-multiply the layer transform by `m`.
    pub fn accumulate(&mut self, m: &Affine) {
        self.set_transform(self.transform.compose(m));
    }

    pub fn translate(&mut self, v: Point) {
        self.set_transform(self.transform.translate(v));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.set_transform(self.transform.scale(sx, sy));
    }

    pub fn rotate(&mut self, radians: f64) {
        self.set_transform(self.transform.rotate(radians));
    }

    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        self.transform.coefficients()
    }

    pub fn set_coefficients(&mut self, coefficients: [f64; 6]) {
        self.set_transform(Affine::from_coefficients(coefficients));
    }

    // --- Coordinate mapping ---

    /// Layer coordinates to device coordinates.
    #[must_use]
    pub fn to_device(&self, point: Point) -> Point {
        self.transform.transform(point)
    }

    /// Device coordinates to layer coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SingularTransform`] if the layer transform has
    /// been given a zero scale.
    pub fn to_layer(&self, point: Point) -> Result<Point, SceneError> {
        Ok(self.inverse()?.transform(point))
    }

    /// Device rect to layer rect, corner by corner.
    ///
    /// # Errors
    ///
    /// Same as [`Layer::to_layer`].
    pub fn rect_to_layer(&self, rect: &Rect) -> Result<Rect, SceneError> {
        let inverse = self.inverse()?;
        Ok(Rect::new(inverse.transform(rect.from), inverse.transform(rect.to)))
    }

    #[must_use]
    pub fn rect_to_device(&self, rect: &Rect) -> Rect {
        Rect::new(self.to_device(rect.from), self.to_device(rect.to))
    }

    fn inverse(&self) -> Result<Affine, SceneError> {
        if let Some(inverse) = self.inverse.get() {
            return Ok(inverse);
        }
        let inverse = self.transform.inverse()?;
        self.inverse.set(Some(inverse));
        Ok(inverse)
    }

    // --- Contact detection ---

    /// Contacts at a device point, in paint order (back to front).
    ///
    /// Plain layers and non-contactable members never produce contacts.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SingularTransform`] if the layer transform is
    /// not invertible.
    pub fn check_contact(&self, point: Point, objects: &dyn ObjectLookup) -> Result<Vec<Contact>, SceneError> {
        if self.kind == LayerKind::Plain {
            return Ok(Vec::new());
        }
        let layer_point = self.to_layer(point)?;
        let contacts = self
            .members
            .iter()
            .filter_map(|&id| {
                let object = objects.lookup(id)?.as_contactable()?;
                let transform = self.member_transform(id)?;
                two_phase_contains(object, &transform, layer_point)
                    .then(|| Contact { object: id, vector: object.position().vector_to(layer_point) })
            })
            .collect();
        Ok(contacts)
    }

    /// Members overlapping `id`, in paint order.
    ///
    /// Membership is captured when the scan starts, so the result never
    /// refers to stale positions even if the caller mutates the layer while
    /// consuming it.
    #[must_use]
    pub fn check_collision(&self, id: ObjectId, objects: &dyn ObjectLookup) -> Vec<ObjectId> {
        if self.kind == LayerKind::Plain || !self.contains(id) {
            return Vec::new();
        }
        let snapshot = self.members.clone();
        snapshot
            .into_iter()
            .filter(|&other| other != id && self.collide(id, other, objects))
            .collect()
    }

    /// Every unordered pair of overlapping members, each pair tested once.
    /// Pairs are `(back, front)` in paint order.
    #[must_use]
    pub fn check_all_collisions(&self, objects: &dyn ObjectLookup) -> Vec<(ObjectId, ObjectId)> {
        if self.kind == LayerKind::Plain {
            return Vec::new();
        }
        let snapshot = self.members.clone();
        let mut pairs = Vec::new();
        for (i, &a) in snapshot.iter().enumerate() {
            for &b in &snapshot[i + 1..] {
                if self.collide(a, b, objects) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Symmetric probe-point test: any probe point of either member, placed
    /// in layer space by its owner's transform, inside the other member.
    fn collide(&self, a: ObjectId, b: ObjectId, objects: &dyn ObjectLookup) -> bool {
        let (Some(object_a), Some(object_b)) = (
            objects.lookup(a).and_then(|o| o.as_contactable()),
            objects.lookup(b).and_then(|o| o.as_contactable()),
        ) else {
            return false;
        };
        let (Some(transform_a), Some(transform_b)) = (self.member_transform(a), self.member_transform(b)) else {
            return false;
        };
        let lands_in = |from: &dyn Contactable, from_t: &Affine, into: &dyn Contactable, into_t: &Affine| {
            from.probe_points()
                .into_iter()
                .any(|p| two_phase_contains(into, into_t, from_t.transform(p)))
        };
        lands_in(object_a, &transform_a, object_b, &transform_b) || lands_in(object_b, &transform_b, object_a, &transform_a)
    }
}

/// Phase I rejects cheaply; phase II runs only for survivors.
fn two_phase_contains(object: &dyn Contactable, transform: &Affine, point: Point) -> bool {
    object.approximate_contains(transform, point) && object.precise_contains(&ProbeSurface::new(*transform), point)
}

/// Chained transform edits on a layer or a member. Each call edits the
/// target in place and hands the transformer back for the next one.
#[allow(clippy::return_self_not_must_use)]
pub trait Transformer: Sized {
    /// Post-multiply the target's transform by `m`.
    fn apply(self, m: &Affine) -> Self;

    fn rotate(self, radians: f64) -> Self {
        self.apply(&Affine::rotation(radians))
    }

    fn scale(self, sx: f64, sy: f64) -> Self {
        self.apply(&Affine::scaling(sx, sy))
    }

    fn translate(self, tx: f64, ty: f64) -> Self {
        self.apply(&Affine::translation(Point::new(tx, ty)))
    }
}

/// Transformer over a whole layer.
pub struct LayerTransformer<'a> {
    layer: &'a mut Layer,
}

impl<'a> LayerTransformer<'a> {
    pub(crate) fn new(layer: &'a mut Layer) -> Self {
        Self { layer }
    }
}

impl Transformer for LayerTransformer<'_> {
    fn apply(self, m: &Affine) -> Self {
        self.layer.accumulate(m);
        self
    }
}

/// Transformer over one member's transform.
pub struct ObjectTransformer<'a> {
    transform: &'a mut Affine,
}

impl<'a> ObjectTransformer<'a> {
    pub(crate) fn new(transform: &'a mut Affine) -> Self {
        Self { transform }
    }
}

impl Transformer for ObjectTransformer<'_> {
    fn apply(self, m: &Affine) -> Self {
        *self.transform = self.transform.compose(m);
        self
    }
}
