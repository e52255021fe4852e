//! The scene: layers, the object arena and the frame clocks.
//!
//! Objects live in an arena keyed by [`ObjectId`]; each entry remembers the
//! layer it belongs to. Layers are append-only and addressed by index. Every
//! layer has its own [`FrameClock`] fed by the root clock's logical time, so a
//! layer can be paced or put to sleep without touching the others, while root
//! pace, pause and sleep affect every layer.
//!
//! A layer is *enabled* while its clock is awake. Disabled layers are not
//! painted, produce no ticks, and take no part in contact or collision
//! queries.
//!
//! Removals are queued so the effect scheduler can cancel the effects that
//! target a removed object, even when the removal happens inside an effect.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use crate::clock::FrameClock;
use crate::contact::{Contact, ContactDetection, LayerContacts};
use crate::effect::Frame;
use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::layer::{Layer, LayerKind, LayerTransformer, ObjectLookup, ObjectTransformer};
use crate::object::{Drawable, ObjectId};

struct Entry {
    object: Box<dyn Drawable>,
    layer: usize,
}

pub struct Scene {
    layers: Vec<Layer>,
    clocks: Vec<FrameClock>,
    root: FrameClock,
    objects: HashMap<ObjectId, Entry>,
    next_id: u64,
    current_layer: usize,
    removed: Vec<ObjectId>,
    dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("layers", &self.layers.len())
            .field("objects", &self.objects.len())
            .field("current_layer", &self.current_layer)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// A scene with a single contact layer, which is current.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::new(LayerKind::Contact)],
            clocks: vec![FrameClock::new()],
            root: FrameClock::new(),
            objects: HashMap::new(),
            next_id: 0,
            current_layer: 0,
            removed: Vec::new(),
            dirty: true,
        }
    }

    // --- Layers ---

    /// Append a contact layer and make it current. Returns its index.
    pub fn next_layer(&mut self) -> usize {
        self.push_layer(LayerKind::Contact)
    }

    /// Append a paint-only layer and make it current. Returns its index.
    pub fn next_plain_layer(&mut self) -> usize {
        self.push_layer(LayerKind::Plain)
    }

    fn push_layer(&mut self, kind: LayerKind) -> usize {
        self.layers.push(Layer::new(kind));
        self.clocks.push(FrameClock::new());
        self.current_layer = self.layers.len() - 1;
        tracing::debug!(layer = self.current_layer, ?kind, "layer created");
        self.current_layer
    }

    /// Make `n` the layer new objects go to by default.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn switch_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.check_layer(n)?;
        self.current_layer = n;
        Ok(())
    }

    #[must_use]
    pub fn current_layer(&self) -> usize {
        self.current_layer
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer(&self, n: usize) -> Result<&Layer, SceneError> {
        self.layers.get(n).ok_or(SceneError::InvalidLayer(n))
    }

    fn layer_mut(&mut self, n: usize) -> Result<&mut Layer, SceneError> {
        self.layers.get_mut(n).ok_or(SceneError::InvalidLayer(n))
    }

    fn check_layer(&self, n: usize) -> Result<(), SceneError> {
        self.layer(n).map(|_| ())
    }

    /// Enabled layers, bottom first.
    pub fn enabled_layers(&self) -> impl Iterator<Item = (usize, &Layer)> {
        self.layers.iter().enumerate().filter(|(n, _)| self.is_enabled(*n))
    }

    fn is_enabled(&self, n: usize) -> bool {
        self.clocks.get(n).is_some_and(|clock| !clock.asleep())
    }

    // --- Objects ---

    /// Add `object` on top of the current layer.
    pub fn add(&mut self, object: impl Drawable + 'static) -> ObjectId {
        self.insert(Box::new(object), self.current_layer)
    }

    /// Add `object` on top of layer `n`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn add_to(&mut self, object: impl Drawable + 'static, n: usize) -> Result<ObjectId, SceneError> {
        self.add_boxed(Box::new(object), Some(n))
    }

    /// Add a boxed object to layer `n`, or to the current layer.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn add_boxed(&mut self, object: Box<dyn Drawable>, n: Option<usize>) -> Result<ObjectId, SceneError> {
        let n = n.unwrap_or(self.current_layer);
        self.check_layer(n)?;
        Ok(self.insert(object, n))
    }

    fn insert(&mut self, object: Box<dyn Drawable>, n: usize) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId::new(self.next_id);
        self.layers[n].add(id);
        self.objects.insert(id, Entry { object, layer: n });
        self.dirty = true;
        tracing::debug!(object = %id, layer = n, "object added");
        id
    }

    /// Remove an object and hand it back. Effects targeting it are cancelled
    /// on the next dispatch.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn remove(&mut self, id: ObjectId) -> Result<Box<dyn Drawable>, SceneError> {
        let entry = self.objects.remove(&id).ok_or(SceneError::UnknownObject(id))?;
        self.layers[entry.layer].remove(id);
        self.removed.push(id);
        self.dirty = true;
        tracing::debug!(object = %id, layer = entry.layer, "object removed");
        Ok(entry.object)
    }

    /// Re-add an object to layer `n`: it leaves its layer, counts as removed
    /// (its effects stop), and lands on top of `n` with an identity transform.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] or [`SceneError::InvalidLayer`].
    pub fn move_drawable(&mut self, id: ObjectId, n: usize) -> Result<(), SceneError> {
        self.check_layer(n)?;
        let entry = self.objects.get_mut(&id).ok_or(SceneError::UnknownObject(id))?;
        let from = entry.layer;
        entry.layer = n;
        self.layers[from].remove(id);
        self.layers[n].add(id);
        self.removed.push(id);
        self.dirty = true;
        tracing::debug!(object = %id, from, to = n, "object moved");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn bring_to_top(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let n = self.layer_of(id)?;
        self.layers[n].bring_to_top(id);
        self.dirty = true;
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn send_to_back(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let n = self.layer_of(id)?;
        self.layers[n].send_to_back(id);
        self.dirty = true;
        Ok(())
    }

    /// Layer holding `id`.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn layer_of(&self, id: ObjectId) -> Result<usize, SceneError> {
        self.find_layer(id).ok_or(SceneError::UnknownObject(id))
    }

    #[must_use]
    pub fn find_layer(&self, id: ObjectId) -> Option<usize> {
        self.objects.get(&id).map(|entry| entry.layer)
    }

    #[must_use]
    pub fn drawable(&self, id: ObjectId) -> Option<&dyn Drawable> {
        self.objects.get(&id).map(|entry| &*entry.object)
    }

    pub fn drawable_mut(&mut self, id: ObjectId) -> Option<&mut dyn Drawable> {
        match self.objects.get_mut(&id) {
            Some(entry) => Some(&mut *entry.object),
            None => None,
        }
    }

    /// Logical position of a positioned object.
    #[must_use]
    pub fn position(&self, id: ObjectId) -> Option<Point> {
        self.drawable(id)?.as_positioned().map(|p| p.position())
    }

    /// Move a positioned object. Returns `false` if the object has no
    /// position.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn set_position(&mut self, id: ObjectId, position: Point) -> Result<bool, SceneError> {
        let object = self.drawable_mut(id).ok_or(SceneError::UnknownObject(id))?;
        let Some(positioned) = object.as_positioned_mut() else {
            return Ok(false);
        };
        positioned.set_position(position);
        self.dirty = true;
        Ok(true)
    }

    // --- Transforms ---

    /// Post-multiply layer `n`'s transform by `m`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn transform_layer(&mut self, n: usize, m: &Affine) -> Result<(), SceneError> {
        self.layer_mut(n)?.accumulate(m);
        self.dirty = true;
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn set_layer_transform(&mut self, n: usize, m: Affine) -> Result<(), SceneError> {
        self.layer_mut(n)?.set_transform(m);
        self.dirty = true;
        Ok(())
    }

    /// Layer transform as `[a, b, c, d, e, f]`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_coefficients(&self, n: usize) -> Result<[f64; 6], SceneError> {
        Ok(self.layer(n)?.coefficients())
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn set_layer_coefficients(&mut self, n: usize, coefficients: [f64; 6]) -> Result<(), SceneError> {
        self.layer_mut(n)?.set_coefficients(coefficients);
        self.dirty = true;
        Ok(())
    }

    /// Post-multiply an object's own transform by `m`.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn transform_object(&mut self, id: ObjectId, m: &Affine) -> Result<(), SceneError> {
        let n = self.layer_of(id)?;
        self.layers[n].accumulate_member_transform(id, m);
        self.dirty = true;
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn set_object_transform(&mut self, id: ObjectId, m: Affine) -> Result<(), SceneError> {
        let n = self.layer_of(id)?;
        self.layers[n].set_member_transform(id, m);
        self.dirty = true;
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn object_transform(&self, id: ObjectId) -> Result<Affine, SceneError> {
        let n = self.layer_of(id)?;
        self.layers[n].member_transform(id).ok_or(SceneError::UnknownObject(id))
    }

    /// Chained edits on layer `n`, or on the current layer.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_transformer(&mut self, n: Option<usize>) -> Result<LayerTransformer<'_>, SceneError> {
        let n = n.unwrap_or(self.current_layer);
        self.dirty = true;
        Ok(LayerTransformer::new(self.layer_mut(n)?))
    }

    /// Chained edits on one object's transform.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn object_transformer(&mut self, id: ObjectId) -> Result<ObjectTransformer<'_>, SceneError> {
        let n = self.layer_of(id)?;
        self.dirty = true;
        let transform = self.layers[n].member_transform_mut(id).ok_or(SceneError::UnknownObject(id))?;
        Ok(ObjectTransformer::new(transform))
    }

    // --- Coordinate mapping ---

    /// Device point to layer `n` coordinates.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`], or [`SceneError::SingularTransform`]
    /// for a non-invertible layer transform.
    pub fn point_in_layer(&self, point: Point, n: usize) -> Result<Point, SceneError> {
        self.layer(n)?.to_layer(point)
    }

    /// Layer `n` point to device coordinates.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn point_from_layer(&self, point: Point, n: usize) -> Result<Point, SceneError> {
        Ok(self.layer(n)?.to_device(point))
    }

    /// Device point to the coordinates of the layer holding `id`.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] or [`SceneError::SingularTransform`].
    pub fn point_in_object_layer(&self, point: Point, id: ObjectId) -> Result<Point, SceneError> {
        self.point_in_layer(point, self.layer_of(id)?)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn point_from_object_layer(&self, point: Point, id: ObjectId) -> Result<Point, SceneError> {
        self.point_from_layer(point, self.layer_of(id)?)
    }

    /// # Errors
    ///
    /// Same as [`Scene::point_in_layer`].
    pub fn rect_in_layer(&self, rect: &Rect, n: usize) -> Result<Rect, SceneError> {
        self.layer(n)?.rect_to_layer(rect)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn rect_from_layer(&self, rect: &Rect, n: usize) -> Result<Rect, SceneError> {
        Ok(self.layer(n)?.rect_to_device(rect))
    }

    /// # Errors
    ///
    /// Same as [`Scene::point_in_object_layer`].
    pub fn rect_in_object_layer(&self, rect: &Rect, id: ObjectId) -> Result<Rect, SceneError> {
        self.rect_in_layer(rect, self.layer_of(id)?)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn rect_from_object_layer(&self, rect: &Rect, id: ObjectId) -> Result<Rect, SceneError> {
        self.rect_from_layer(rect, self.layer_of(id)?)
    }

    // --- Collisions ---

    /// Objects overlapping `id` in its layer. Empty when that layer is
    /// disabled or paint-only.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn check_collision(&self, id: ObjectId) -> Result<Vec<ObjectId>, SceneError> {
        let n = self.layer_of(id)?;
        if !self.is_enabled(n) {
            return Ok(Vec::new());
        }
        Ok(self.layers[n].check_collision(id, self))
    }

    /// Every overlapping pair across enabled contact layers.
    #[must_use]
    pub fn check_all_collisions(&self) -> Vec<(ObjectId, ObjectId)> {
        self.enabled_layers().flat_map(|(_, layer)| layer.check_all_collisions(self)).collect()
    }

    // --- Clocks ---

    /// Advance every clock to the host timestamp `now` (milliseconds).
    pub fn tick(&mut self, now: f64) -> Frame {
        let root = self.root.advance(now);
        let layers = self
            .clocks
            .iter_mut()
            .map(|clock| root.and_then(|tick| clock.advance(tick.time)))
            .collect();
        Frame { root, layers }
    }

    /// Scale the speed of every layer.
    pub fn pace(&mut self, factor: f64) {
        self.root.pace(factor);
    }

    #[must_use]
    pub fn current_pace(&self) -> f64 {
        self.root.current_pace()
    }

    pub fn pause(&mut self) {
        self.root.pause();
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.root.paused()
    }

    /// Wake the root clock and unpause it.
    pub fn resume(&mut self) {
        self.root.resume();
    }

    pub fn sleep(&mut self) {
        self.root.sleep();
    }

    #[must_use]
    pub fn asleep(&self) -> bool {
        self.root.asleep()
    }

    /// Wake layer `n`: it ticks, paints and answers queries again.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn enable_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.layer_clock_mut(n)?.resume();
        self.dirty = true;
        tracing::debug!(layer = n, "layer enabled");
        Ok(())
    }

    /// Put layer `n` to sleep: no ticks, no painting, no contacts.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn disable_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.layer_clock_mut(n)?.sleep();
        self.dirty = true;
        tracing::debug!(layer = n, "layer disabled");
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_enabled(&self, n: usize) -> Result<bool, SceneError> {
        self.check_layer(n)?;
        Ok(self.is_enabled(n))
    }

    /// Freeze motion in layer `n` while it keeps ticking, painting and
    /// answering queries. Its pace is left unchanged.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn pause_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.layer_clock_mut(n)?.pause();
        Ok(())
    }

    /// Undo [`Scene::pause_layer`]. A disabled layer stays disabled.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn resume_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.layer_clock_mut(n)?.unpause();
        Ok(())
    }

    /// Scale the speed of layer `n` only.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn pace_layer(&mut self, n: usize, factor: f64) -> Result<(), SceneError> {
        self.layer_clock_mut(n)?.pace(factor);
        Ok(())
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_clock(&self, n: usize) -> Result<&FrameClock, SceneError> {
        self.clocks.get(n).ok_or(SceneError::InvalidLayer(n))
    }

    fn layer_clock_mut(&mut self, n: usize) -> Result<&mut FrameClock, SceneError> {
        self.clocks.get_mut(n).ok_or(SceneError::InvalidLayer(n))
    }

    // --- Bookkeeping for the engine ---

    /// Forget the host time phase, so the next tick measures no elapsed
    /// time whatever gap preceded it.
    pub fn reset_phase(&mut self) {
        self.root.reset_phase();
    }

    /// Objects removed or moved since the last call.
    pub fn take_removed(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.removed)
    }

    /// Ask for a render on the next frame.
    pub fn request_render(&mut self) {
        self.dirty = true;
    }

    /// Whether a render was requested since the last call, clearing the flag.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

impl ObjectLookup for Scene {
    fn lookup(&self, id: ObjectId) -> Option<&dyn Drawable> {
        self.drawable(id)
    }
}

impl ContactDetection for Scene {
    fn check_contact(&self, point: Point) -> Result<Vec<Contact>, SceneError> {
        let mut contacts = Vec::new();
        for (_, layer) in self.enabled_layers() {
            contacts.extend(layer.check_contact(point, self)?);
        }
        Ok(contacts)
    }

    fn check_contact_above_layer(&self, point: Point, n: usize) -> Result<Vec<Contact>, SceneError> {
        self.check_layer(n)?;
        let mut contacts = Vec::new();
        for (_, layer) in self.enabled_layers().filter(|(index, _)| *index > n) {
            contacts.extend(layer.check_contact(point, self)?);
        }
        Ok(contacts)
    }

    fn check_contact_in_layer(&self, point: Point, n: usize) -> Result<Vec<Contact>, SceneError> {
        let layer = self.layer(n)?;
        if !self.is_enabled(n) {
            return Ok(Vec::new());
        }
        layer.check_contact(point, self)
    }

    fn check_layer_contacts(&self, point: Point) -> Result<Vec<LayerContacts>, SceneError> {
        (0..self.layers.len())
            .map(|n| Ok(LayerContacts { layer: n, contacts: self.check_contact_in_layer(point, n)? }))
            .collect()
    }
}
