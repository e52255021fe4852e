//! The scene engine: lifecycle, input dispatch and the per-frame loop.
//!
//! [`Engine`] owns a [`Scene`], a drawing [`Surface`], the gesture recognizer
//! and the effect scheduler. It has no event loop of its own; the host drives
//! it from three sources:
//!
//! - [`Engine::frame`] on every animation frame,
//! - [`Engine::pointer_down`], [`Engine::pointer_move`], [`Engine::pointer_up`]
//!   for raw input,
//! - [`Engine::advance_timers`] when [`Engine::next_deadline`] comes due.
//!
//! A frame fires due gesture timers, ticks every clock, feeds the tick (and a
//! collision snapshot when an effect wants one) to the effects, then renders
//! once if anything asked for it since the previous render. However many
//! effects pulse in between, a frame renders at most once.
//!
//! The engine separates the testable core from the browser: it is generic
//! over [`Surface`], and [`crate::web`] binds it to a real canvas.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use crate::config::EngineConfig;
use crate::contact::{Contact, ContactDetection};
use crate::effect::{Effect, EffectId, EffectScheduler, SceneEvent};
use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::input::{GestureRecognizer, PointerEvent};
use crate::layer::{LayerTransformer, ObjectTransformer};
use crate::object::{Drawable, ObjectId};
use crate::render::{Surface, render};
use crate::scene::Scene;

// =============================================================
// FPS counter
// =============================================================

/// Counts renders in fixed windows of logical host time.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: f64,
    started: Option<f64>,
    count: u32,
    last: Option<u32>,
}

impl FpsCounter {
    #[must_use]
    pub fn new(window_ms: f64) -> Self {
        Self { window: window_ms, started: None, count: 0, last: None }
    }

    /// Count one render at host time `now`.
    pub fn record(&mut self, now: f64) {
        match self.started {
            Some(start) if now - start < self.window => {}
            Some(_) => {
                tracing::trace!(fps = self.count, "fps window closed");
                self.last = Some(self.count);
                self.count = 0;
                self.started = Some(now);
            }
            None => self.started = Some(now),
        }
        self.count += 1;
    }

    /// Renders in the window still open.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.count
    }

    /// Renders in the last closed window.
    #[must_use]
    pub fn last(&self) -> Option<u32> {
        self.last
    }
}

// =============================================================
// Engine
// =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    TornDown,
}

pub struct Engine<S> {
    surface: S,
    scene: Scene,
    gestures: GestureRecognizer,
    effects: EffectScheduler,
    config: EngineConfig,
    fps: FpsCounter,
    lifecycle: Lifecycle,
    render_pending: bool,
    renders: u64,
}

impl<S> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scene", &self.scene)
            .field("effects", &self.effects)
            .field("lifecycle", &self.lifecycle)
            .field("renders", &self.renders)
            .finish_non_exhaustive()
    }
}

impl<S: Surface> Engine<S> {
    /// Build an engine over `surface`. Effects can be played once
    /// [`Engine::init`] has run.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidTiming`] if `config` fails validation.
    pub fn new(surface: S, config: EngineConfig) -> Result<Self, SceneError> {
        config.validate()?;
        Ok(Self {
            surface,
            scene: Scene::new(),
            gestures: GestureRecognizer::new(config.gesture)?,
            effects: EffectScheduler::new(),
            fps: FpsCounter::new(config.fps_window_ms),
            config,
            lifecycle: Lifecycle::Created,
            render_pending: true,
            renders: 0,
        })
    }

    // --- Lifecycle ---

    /// Wire the input and effect pipeline.
    pub fn init(&mut self) {
        if self.lifecycle == Lifecycle::Running {
            return;
        }
        if self.lifecycle == Lifecycle::TornDown {
            // Time spent torn down must not reach the effects as one long tick.
            self.scene.reset_phase();
        }
        self.lifecycle = Lifecycle::Running;
        self.render_pending = true;
        tracing::info!(layers = self.scene.layer_count(), objects = self.scene.len(), "engine initialized");
    }

    /// Drop every effect and every pending gesture race. Input and frames are
    /// ignored until the next [`Engine::init`].
    pub fn teardown(&mut self) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        self.effects.clear();
        self.gestures.reset();
        self.lifecycle = Lifecycle::TornDown;
        tracing::info!(renders = self.renders, "engine torn down");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    // --- Accessors ---

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access. Removals made here cancel their effects on the
    /// next dispatch.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Completed render passes since construction.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }

    #[must_use]
    pub fn fps(&self) -> &FpsCounter {
        &self.fps
    }

    // --- Drawables ---

    /// Add `drawable` on top of layer `n`, or of the current layer.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn add_drawable(&mut self, drawable: impl Drawable + 'static, n: Option<usize>) -> Result<ObjectId, SceneError> {
        self.scene.add_boxed(Box::new(drawable), n)
    }

    /// Remove an object and stop every effect that targets it.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] ("unknown graph") if `id` is not in the
    /// scene.
    pub fn remove_drawable(&mut self, id: ObjectId) -> Result<Box<dyn Drawable>, SceneError> {
        let object = self.scene.remove(id)?;
        self.effects.sync_removals(&mut self.scene);
        Ok(object)
    }

    /// Re-add an object on top of layer `n`, or of the current layer. Its
    /// transform resets and its effects stop.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] or [`SceneError::InvalidLayer`].
    pub fn readd_drawable(&mut self, id: ObjectId, n: Option<usize>) -> Result<(), SceneError> {
        self.scene.move_drawable(id, n.unwrap_or(self.scene.current_layer()))?;
        self.effects.sync_removals(&mut self.scene);
        Ok(())
    }

    // --- Layers ---

    /// Append a contact layer and make it current.
    pub fn next_layer(&mut self) -> usize {
        self.scene.next_layer()
    }

    /// Append a paint-only layer and make it current.
    pub fn next_plain_layer(&mut self) -> usize {
        self.scene.next_plain_layer()
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn switch_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.scene.switch_layer(n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn enable_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.scene.enable_layer(n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn disable_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.scene.disable_layer(n)
    }

    // --- Transforms and mapping ---

    /// Post-multiply layer `n`'s transform by `m`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn transform_layer(&mut self, n: usize, m: &Affine) -> Result<(), SceneError> {
        self.scene.transform_layer(n, m)
    }

    /// Post-multiply an object's transform by `m`.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn transform_object(&mut self, id: ObjectId, m: &Affine) -> Result<(), SceneError> {
        self.scene.transform_object(id, m)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_transformer(&mut self, n: Option<usize>) -> Result<LayerTransformer<'_>, SceneError> {
        self.scene.layer_transformer(n)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn object_transformer(&mut self, id: ObjectId) -> Result<ObjectTransformer<'_>, SceneError> {
        self.scene.object_transformer(id)
    }

    /// Layer transform as `[a, b, c, d, e, f]`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_coefficients(&self, n: usize) -> Result<[f64; 6], SceneError> {
        self.scene.layer_coefficients(n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn set_layer_coefficients(&mut self, n: usize, coefficients: [f64; 6]) -> Result<(), SceneError> {
        self.scene.set_layer_coefficients(n, coefficients)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] or [`SceneError::SingularTransform`].
    pub fn point_in_layer(&self, point: Point, n: usize) -> Result<Point, SceneError> {
        self.scene.point_in_layer(point, n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn point_from_layer(&self, point: Point, n: usize) -> Result<Point, SceneError> {
        self.scene.point_from_layer(point, n)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] or [`SceneError::SingularTransform`].
    pub fn point_in_object_layer(&self, point: Point, id: ObjectId) -> Result<Point, SceneError> {
        self.scene.point_in_object_layer(point, id)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn point_from_object_layer(&self, point: Point, id: ObjectId) -> Result<Point, SceneError> {
        self.scene.point_from_object_layer(point, id)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] or [`SceneError::SingularTransform`].
    pub fn rect_in_layer(&self, rect: &Rect, n: usize) -> Result<Rect, SceneError> {
        self.scene.rect_in_layer(rect, n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn rect_from_layer(&self, rect: &Rect, n: usize) -> Result<Rect, SceneError> {
        self.scene.rect_from_layer(rect, n)
    }

    // --- Contacts and collisions ---

    /// # Errors
    ///
    /// [`SceneError::SingularTransform`] for a non-invertible layer.
    pub fn check_contact(&self, point: Point) -> Result<Vec<Contact>, SceneError> {
        self.scene.check_contact(point)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] or [`SceneError::SingularTransform`].
    pub fn check_contact_above_layer(&self, point: Point, n: usize) -> Result<Vec<Contact>, SceneError> {
        self.scene.check_contact_above_layer(point, n)
    }

    /// # Errors
    ///
    /// [`SceneError::UnknownObject`] if `id` is not in the scene.
    pub fn check_collision(&self, id: ObjectId) -> Result<Vec<ObjectId>, SceneError> {
        self.scene.check_collision(id)
    }

    // --- Clocks ---

    pub fn pace(&mut self, factor: f64) {
        self.scene.pace(factor);
    }

    pub fn pause(&mut self) {
        self.scene.pause();
    }

    pub fn resume(&mut self) {
        self.scene.resume();
    }

    pub fn sleep(&mut self) {
        self.scene.sleep();
    }

    #[must_use]
    pub fn current_pace(&self) -> f64 {
        self.scene.current_pace()
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.scene.paused()
    }

    #[must_use]
    pub fn asleep(&self) -> bool {
        self.scene.asleep()
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn layer_enabled(&self, n: usize) -> Result<bool, SceneError> {
        self.scene.layer_enabled(n)
    }

    /// Scale the speed of layer `n` only.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn pace_layer(&mut self, n: usize, factor: f64) -> Result<(), SceneError> {
        self.scene.pace_layer(n, factor)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn pause_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.scene.pause_layer(n)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidLayer`] if `n` is out of range.
    pub fn resume_layer(&mut self, n: usize) -> Result<(), SceneError> {
        self.scene.resume_layer(n)
    }

    // --- Effects ---

    /// Start an effect.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotInitialized`] before [`Engine::init`] or after
    /// [`Engine::teardown`]; [`SceneError::UnknownObject`] if the effect
    /// targets an object that is not in the scene.
    pub fn play_effect(&mut self, effect: impl Effect + 'static) -> Result<EffectId, SceneError> {
        if !self.is_initialized() {
            return Err(SceneError::NotInitialized);
        }
        if let Some(target) = effect.target() {
            if !self.scene.contains(target) {
                return Err(SceneError::UnknownObject(target));
            }
        }
        // Flush removals made through `scene_mut` so they cannot hit the new effect.
        self.effects.sync_removals(&mut self.scene);
        Ok(self.effects.play(Box::new(effect)))
    }

    /// Stop an effect. Returns `false` if it was not playing.
    pub fn cancel_effect(&mut self, id: EffectId) -> bool {
        self.effects.cancel(id)
    }

    #[must_use]
    pub fn is_playing(&self, id: EffectId) -> bool {
        self.effects.is_playing(id)
    }

    /// Number of effects still playing.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    // --- Input ---

    pub fn enable_pointer(&mut self) {
        self.gestures.enable();
    }

    pub fn disable_pointer(&mut self) {
        self.gestures.disable();
    }

    /// Pointer went down at a surface point. The front-most contact there is
    /// captured for the drags this press starts.
    ///
    /// # Errors
    ///
    /// [`SceneError::SingularTransform`] from the contact probe, or the first
    /// error raised by an effect.
    pub fn pointer_down(&mut self, point: Point, now: f64) -> Result<(), SceneError> {
        if !self.is_initialized() {
            return Ok(());
        }
        let contact = if self.gestures.enabled() { self.scene.top_contact(point)? } else { None };
        let events = self.gestures.start(point, now, contact);
        self.deliver(&events)
    }

    /// # Errors
    ///
    /// The first error raised by an effect.
    pub fn pointer_move(&mut self, point: Point, now: f64) -> Result<(), SceneError> {
        if !self.is_initialized() {
            return Ok(());
        }
        let events = self.gestures.moved(point, now);
        self.deliver(&events)
    }

    /// # Errors
    ///
    /// The first error raised by an effect.
    pub fn pointer_up(&mut self, point: Point, now: f64) -> Result<(), SceneError> {
        if !self.is_initialized() {
            return Ok(());
        }
        let events = self.gestures.end(point, now);
        self.deliver(&events)
    }

    /// Fire gesture races due at `now`.
    ///
    /// # Errors
    ///
    /// The first error raised by an effect.
    pub fn advance_timers(&mut self, now: f64) -> Result<(), SceneError> {
        if !self.is_initialized() {
            return Ok(());
        }
        let events = self.gestures.advance(now);
        self.deliver(&events)
    }

    /// When the host should call [`Engine::advance_timers`] next.
    #[must_use]
    pub fn next_deadline(&self) -> Option<f64> {
        self.gestures.next_deadline()
    }

    fn deliver(&mut self, events: &[PointerEvent]) -> Result<(), SceneError> {
        for event in events {
            self.dispatch(&SceneEvent::Pointer(event))?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &SceneEvent<'_>) -> Result<(), SceneError> {
        if self.effects.dispatch(event, &mut self.scene)? {
            self.render_pending = true;
        }
        Ok(())
    }

    // --- Frame loop ---

    /// Run one animation frame at host time `now` (milliseconds). Returns
    /// whether the surface was repainted.
    ///
    /// A render failure is logged and retried on the next frame.
    ///
    /// # Errors
    ///
    /// The first error raised by an effect. The pending render stays pending.
    pub fn frame(&mut self, now: f64) -> Result<bool, SceneError> {
        if !self.is_initialized() {
            return Ok(false);
        }
        self.advance_timers(now)?;

        let frame = self.scene.tick(now);
        self.dispatch(&SceneEvent::Frame(&frame))?;

        if frame.root.is_some_and(|tick| !tick.is_frozen()) && self.effects.wants_collisions() {
            let pairs = self.scene.check_all_collisions();
            if !pairs.is_empty() {
                tracing::trace!(pairs = pairs.len(), "collision snapshot");
                self.dispatch(&SceneEvent::Collisions(&pairs))?;
            }
        }

        Ok(self.flush(now))
    }

    fn flush(&mut self, now: f64) -> bool {
        self.render_pending |= self.scene.take_render_request();
        if !self.render_pending {
            return false;
        }
        match render(&mut self.surface, &self.scene, &self.config.background) {
            Ok(()) => {
                self.render_pending = false;
                self.renders += 1;
                self.fps.record(now);
                true
            }
            Err(err) => {
                tracing::warn!(%err, "render failed; retrying next frame");
                false
            }
        }
    }
}
