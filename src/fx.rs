//! Built-in effects.
//!
//! Time-driven effects read the clock of the layer that holds their target
//! (or of the layer they move), never the root clock, so pausing or pacing a
//! layer freezes or slows exactly its own effects. A frozen tick (zero delta)
//! changes nothing and asks for no render.
//!
//! | Effect | Drives | Ends |
//! |--------|--------|------|
//! | [`MoveTo`] | target position, linear or curved, eased or not | on arrival |
//! | [`Spin`] | target transform, `2π·Δt/period` per tick | never |
//! | [`Oscillate`] | target transform, `amplitude·sin(2π·t/period)` | never |
//! | [`FollowVectors`] | target transform, one vector per period | never |
//! | [`DragFollow`] | target position under the drag point, spring-back on colliding drops | never |
//! | [`GlideToPress`] | target position, eased towards presses on empty space | never |
//! | [`PanLayer`] | layer translation while dragging empty space | never |
//! | [`ShiftLayer`] | axis-locked layer translation, unless a layer above is hit | never |
//! | [`FocusLayer`] | layer translation coefficients, eased | on arrival |
//! | [`CollisionWatch`] | whatever its handler does | never |
//! | [`EffectSwitcher`] | one of several effects, cycled by a gesture on the target | never |

#[cfg(test)]
#[path = "fx_test.rs"]
mod fx_test;

use std::f64::consts::TAU;

use crate::clock::Tick;
use crate::config::EngineConfig;
use crate::consts::{DEFAULT_PERIOD_MS, FOCUS_MS, GLIDE_MS};
use crate::contact::ContactDetection;
use crate::effect::{Effect, Frame, Pulse, SceneEvent};
use crate::error::SceneError;
use crate::geom::{Affine, Point, ease};
use crate::input::{Drag, PointerEvent};
use crate::object::ObjectId;
use crate::scene::Scene;

// =============================================================
// Movement
// =============================================================

/// Shape of the path a [`Movement`] follows between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Path {
    Line,
    /// Quadratic Bézier through one control point.
    Quadratic(Point),
    /// Cubic Bézier through two control points.
    Cubic(Point, Point),
}

impl Path {
    fn point(self, from: Point, to: Point, t: f64) -> Point {
        let u = 1.0 - t;
        match self {
            Self::Line => from.lerp(to, t),
            Self::Quadratic(c) => Point::new(
                u * u * from.x + 2.0 * u * t * c.x + t * t * to.x,
                u * u * from.y + 2.0 * u * t * c.y + t * t * to.y,
            ),
            Self::Cubic(c1, c2) => Point::new(
                u * u * u * from.x + 3.0 * u * u * t * c1.x + 3.0 * u * t * t * c2.x + t * t * t * to.x,
                u * u * u * from.y + 3.0 * u * u * t * c1.y + 3.0 * u * t * t * c2.y + t * t * t * to.y,
            ),
        }
    }
}

/// Duration of a trip from `from` to `to` at `pixels_per_second`, measured
/// on the straight chord. A non-positive speed arrives immediately.
fn chord_duration(from: Point, to: Point, pixels_per_second: f64) -> f64 {
    if pixels_per_second > 0.0 { 1000.0 * from.distance(to) / pixels_per_second } else { 0.0 }
}

/// Progression between two points over a fixed duration, along a straight
/// line or a quadratic or cubic Bézier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    from: Point,
    to: Point,
    path: Path,
    duration: f64,
    eased: bool,
}

impl Movement {
    #[must_use]
    pub fn new(from: Point, to: Point, duration_ms: f64) -> Self {
        Self::along(from, to, Path::Line, duration_ms)
    }

    /// Movement at a constant speed in pixels per second.
    /// A non-positive speed arrives immediately.
    #[must_use]
    pub fn at_speed(from: Point, to: Point, pixels_per_second: f64) -> Self {
        Self::new(from, to, chord_duration(from, to, pixels_per_second))
    }

    /// Quadratic curve bent towards `control`.
    #[must_use]
    pub fn quadratic(from: Point, control: Point, to: Point, duration_ms: f64) -> Self {
        Self::along(from, to, Path::Quadratic(control), duration_ms)
    }

    /// Quadratic curve whose duration is the chord length at the given speed.
    #[must_use]
    pub fn quadratic_at_speed(from: Point, control: Point, to: Point, pixels_per_second: f64) -> Self {
        Self::quadratic(from, control, to, chord_duration(from, to, pixels_per_second))
    }

    /// Cubic Bézier curve through two control points.
    #[must_use]
    pub fn bezier(from: Point, control1: Point, control2: Point, to: Point, duration_ms: f64) -> Self {
        Self::along(from, to, Path::Cubic(control1, control2), duration_ms)
    }

    /// Cubic curve whose duration is the chord length at the given speed.
    #[must_use]
    pub fn bezier_at_speed(from: Point, control1: Point, control2: Point, to: Point, pixels_per_second: f64) -> Self {
        Self::bezier(from, control1, control2, to, chord_duration(from, to, pixels_per_second))
    }

    fn along(from: Point, to: Point, path: Path, duration_ms: f64) -> Self {
        Self { from, to, path, duration: duration_ms.max(0.0), eased: false }
    }

    /// Use [`ease`] on the progress ratio.
    #[must_use]
    pub fn eased(mut self) -> Self {
        self.eased = true;
        self
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[must_use]
    pub fn is_done(&self, elapsed: f64) -> bool {
        elapsed >= self.duration
    }

    /// Point after `elapsed` ms. Exactly `to` once the duration is reached.
    #[must_use]
    pub fn point_at(&self, elapsed: f64) -> Point {
        if self.is_done(elapsed) {
            return self.to;
        }
        let alpha = (elapsed / self.duration).max(0.0);
        let alpha = if self.eased { ease(alpha) } else { alpha };
        self.path.point(self.from, self.to, alpha)
    }
}

/// A movement anchored at the first tick it sees.
#[derive(Debug, Clone, Copy)]
struct Run {
    movement: Movement,
    started: f64,
}

impl Run {
    fn point(&self, tick: Tick) -> (Point, bool) {
        let elapsed = tick.time - self.started;
        (self.movement.point_at(elapsed), self.movement.is_done(elapsed))
    }
}

fn validate_period(period: f64) -> Result<f64, SceneError> {
    if period.is_finite() && period != 0.0 {
        Ok(period)
    } else {
        Err(SceneError::InvalidTiming { name: "period", value: period })
    }
}

fn frame_of<'a>(event: &SceneEvent<'a>) -> Option<&'a Frame> {
    match event {
        SceneEvent::Frame(frame) => Some(*frame),
        _ => None,
    }
}

// =============================================================
// MoveTo
// =============================================================

#[derive(Debug, Clone, Copy)]
enum Timing {
    Duration(f64),
    Speed(f64),
}

/// Moves the target's position to a destination and finishes there.
#[derive(Debug, Clone)]
pub struct MoveTo {
    target: ObjectId,
    from: Option<Point>,
    to: Point,
    timing: Timing,
    path: Path,
    eased: bool,
    run: Option<Run>,
}

impl MoveTo {
    /// Move over `duration_ms`, starting from wherever the target is on the
    /// first tick.
    #[must_use]
    pub fn new(target: ObjectId, to: Point, duration_ms: f64) -> Self {
        Self { target, from: None, to, timing: Timing::Duration(duration_ms), path: Path::Line, eased: false, run: None }
    }

    /// Move at a constant speed in pixels per second.
    #[must_use]
    pub fn at_speed(target: ObjectId, to: Point, pixels_per_second: f64) -> Self {
        Self { timing: Timing::Speed(pixels_per_second), ..Self::new(target, to, 0.0) }
    }

    /// Start from `from` instead of the current position.
    #[must_use]
    pub fn starting_at(mut self, from: Point) -> Self {
        self.from = Some(from);
        self
    }

    /// Bend the trip into a quadratic curve towards `control`.
    #[must_use]
    pub fn via(mut self, control: Point) -> Self {
        self.path = Path::Quadratic(control);
        self
    }

    /// Bend the trip into a cubic curve through two control points.
    #[must_use]
    pub fn via_pair(mut self, control1: Point, control2: Point) -> Self {
        self.path = Path::Cubic(control1, control2);
        self
    }

    #[must_use]
    pub fn eased(mut self) -> Self {
        self.eased = true;
        self
    }

    fn advance(&mut self, frame: &Frame, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(tick) = frame.tick_for(scene, self.target) else {
            return Ok(Pulse::Quiet);
        };
        let run = match self.run {
            Some(run) => {
                if tick.is_frozen() {
                    return Ok(Pulse::Quiet);
                }
                run
            }
            None => {
                let Some(from) = self.from.or_else(|| scene.position(self.target)) else {
                    return Ok(Pulse::Finish);
                };
                let duration = match self.timing {
                    Timing::Duration(ms) => ms,
                    Timing::Speed(speed) => chord_duration(from, self.to, speed),
                };
                let movement = Movement::along(from, self.to, self.path, duration);
                let movement = if self.eased { movement.eased() } else { movement };
                let run = Run { movement, started: tick.time };
                self.run = Some(run);
                if tick.is_frozen() {
                    return Ok(Pulse::Quiet);
                }
                run
            }
        };
        let (point, done) = run.point(tick);
        scene.set_position(self.target, point)?;
        Ok(if done { Pulse::RenderAndFinish } else { Pulse::Render })
    }
}

impl Effect for MoveTo {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        match frame_of(event) {
            Some(frame) => self.advance(frame, scene),
            None => Ok(Pulse::Quiet),
        }
    }
}

// =============================================================
// Spin
// =============================================================

/// Rotates the target's transform by `2π·Δt/period` radians per tick.
/// A negative period spins the other way.
#[derive(Debug, Clone, Copy)]
pub struct Spin {
    target: ObjectId,
    period: f64,
}

impl Spin {
    /// # Errors
    ///
    /// [`SceneError::InvalidTiming`] for a zero or non-finite period.
    pub fn new(target: ObjectId, period_ms: f64) -> Result<Self, SceneError> {
        Ok(Self { target, period: validate_period(period_ms)? })
    }

    /// One turn per second.
    #[must_use]
    pub fn steady(target: ObjectId) -> Self {
        Self { target, period: DEFAULT_PERIOD_MS }
    }
}

impl Effect for Spin {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(tick) = frame_of(event).and_then(|frame| frame.tick_for(scene, self.target)) else {
            return Ok(Pulse::Quiet);
        };
        if tick.is_frozen() {
            return Ok(Pulse::Quiet);
        }
        scene.transform_object(self.target, &Affine::rotation(TAU * tick.delta / self.period))?;
        Ok(Pulse::Render)
    }
}

// =============================================================
// Oscillate
// =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn vector(self, length: f64) -> Point {
        match self {
            Self::Horizontal => Point::new(length, 0.0),
            Self::Vertical => Point::new(0.0, length),
        }
    }

    /// The component of `v` along this axis.
    fn project(self, v: Point) -> Point {
        match self {
            Self::Horizontal => Point::new(v.x, 0.0),
            Self::Vertical => Point::new(0.0, v.y),
        }
    }
}

/// Sways the target along one axis by `amplitude·sin(2π·t/period)`,
/// applied as successive translation deltas.
#[derive(Debug, Clone, Copy)]
pub struct Oscillate {
    target: ObjectId,
    amplitude: f64,
    axis: Axis,
    period: f64,
    elapsed: f64,
    offset: f64,
}

impl Oscillate {
    /// # Errors
    ///
    /// [`SceneError::InvalidTiming`] for a zero or non-finite period.
    pub fn new(target: ObjectId, amplitude: f64, axis: Axis, period_ms: f64) -> Result<Self, SceneError> {
        Ok(Self { target, amplitude, axis, period: validate_period(period_ms)?, elapsed: 0.0, offset: 0.0 })
    }

    /// Offset from the rest position after `elapsed` ms.
    fn offset_at(&self, elapsed: f64) -> f64 {
        self.amplitude * (TAU * elapsed / self.period).sin()
    }
}

impl Effect for Oscillate {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(tick) = frame_of(event).and_then(|frame| frame.tick_for(scene, self.target)) else {
            return Ok(Pulse::Quiet);
        };
        if tick.is_frozen() {
            return Ok(Pulse::Quiet);
        }
        self.elapsed += tick.delta;
        let offset = self.offset_at(self.elapsed);
        let step = offset - self.offset;
        self.offset = offset;
        scene.transform_object(self.target, &Affine::translation(self.axis.vector(step)))?;
        Ok(Pulse::Render)
    }
}

// =============================================================
// FollowVectors
// =============================================================

/// Translates the target by `vectors[k]` each time period `k` begins,
/// cycling through the list.
#[derive(Debug, Clone)]
pub struct FollowVectors {
    target: ObjectId,
    vectors: Vec<Point>,
    period: f64,
    elapsed: f64,
    index: Option<usize>,
}

impl FollowVectors {
    /// # Errors
    ///
    /// [`SceneError::InvalidTiming`] for a non-positive period,
    /// [`SceneError::Config`] for an empty vector list.
    pub fn new(target: ObjectId, vectors: Vec<Point>, period_ms: f64) -> Result<Self, SceneError> {
        if !(period_ms.is_finite() && period_ms > 0.0) {
            return Err(SceneError::InvalidTiming { name: "period", value: period_ms });
        }
        if vectors.is_empty() {
            return Err(SceneError::Config("follow-vectors needs at least one vector".into()));
        }
        Ok(Self { target, vectors, period: period_ms, elapsed: 0.0, index: None })
    }
}

impl Effect for FollowVectors {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(tick) = frame_of(event).and_then(|frame| frame.tick_for(scene, self.target)) else {
            return Ok(Pulse::Quiet);
        };
        if tick.is_frozen() {
            return Ok(Pulse::Quiet);
        }
        self.elapsed += tick.delta;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = ((self.elapsed / self.period).floor() as usize) % self.vectors.len();
        if self.index == Some(index) {
            return Ok(Pulse::Quiet);
        }
        self.index = Some(index);
        scene.transform_object(self.target, &Affine::translation(self.vectors[index]))?;
        Ok(Pulse::Render)
    }
}

// =============================================================
// DragFollow
// =============================================================

#[derive(Debug, Clone, Copy)]
struct Grab {
    /// Layer-space position of the target when the drag began.
    home: Point,
}

/// Keeps the target under the pointer while it is dragged by a contact on
/// it. With spring-back enabled, a drop that leaves the target colliding
/// with something moves it back to where the drag began.
#[derive(Debug, Clone)]
pub struct DragFollow {
    target: ObjectId,
    spring_back_ms: Option<f64>,
    grab: Option<Grab>,
    spring: Option<MoveTo>,
}

impl DragFollow {
    #[must_use]
    pub fn new(target: ObjectId) -> Self {
        Self { target, spring_back_ms: None, grab: None, spring: None }
    }

    /// Spring back over `duration_ms` after a colliding drop.
    #[must_use]
    pub fn with_spring_back(mut self, duration_ms: f64) -> Self {
        self.spring_back_ms = Some(duration_ms);
        self
    }

    /// Spring back over the engine's configured duration.
    #[must_use]
    pub fn springy(self, config: &EngineConfig) -> Self {
        self.with_spring_back(config.spring_back_ms)
    }

    fn drag(&mut self, drag: &Drag, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(contact) = drag.contact.filter(|c| c.object == self.target) else {
            return Ok(Pulse::Quiet);
        };
        let origin = scene.point_in_object_layer(drag.origin, self.target)?;
        let point = scene.point_in_object_layer(drag.point, self.target)?;
        if self.grab.is_none() {
            self.grab = Some(Grab { home: origin - contact.vector });
            self.spring = None;
        }
        Ok(Pulse::from_change(scene.set_position(self.target, point - contact.vector)?))
    }

    fn release(&mut self, scene: &Scene) -> Result<Pulse, SceneError> {
        let (Some(grab), Some(duration)) = (self.grab.take(), self.spring_back_ms) else {
            return Ok(Pulse::Quiet);
        };
        let colliding = scene.check_collision(self.target)?;
        if !colliding.is_empty() {
            tracing::debug!(target = %self.target, hits = colliding.len(), "drop collides, springing back");
            self.spring = Some(MoveTo::new(self.target, grab.home, duration).eased());
        }
        Ok(Pulse::Quiet)
    }
}

impl Effect for DragFollow {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        match event {
            SceneEvent::Pointer(PointerEvent::Drag(drag)) => self.drag(drag, scene),
            SceneEvent::Pointer(PointerEvent::End(_)) => self.release(scene),
            SceneEvent::Frame(frame) => {
                let Some(spring) = self.spring.as_mut() else {
                    return Ok(Pulse::Quiet);
                };
                let pulse = spring.advance(frame, scene)?;
                if pulse.finishes() {
                    self.spring = None;
                }
                Ok(Pulse::from_change(pulse.renders()))
            }
            _ => Ok(Pulse::Quiet),
        }
    }
}

// =============================================================
// GlideToPress
// =============================================================

/// Glides the target, eased, to wherever the pointer goes down on empty
/// space. A new press redirects a glide in progress from where the target
/// is at that moment.
#[derive(Debug, Clone)]
pub struct GlideToPress {
    target: ObjectId,
    duration: f64,
    glide: Option<MoveTo>,
}

impl GlideToPress {
    #[must_use]
    pub fn new(target: ObjectId) -> Self {
        Self { target, duration: GLIDE_MS, glide: None }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = duration_ms;
        self
    }

    fn press(&mut self, point: Point, scene: &Scene) -> Result<Pulse, SceneError> {
        if scene.point_without_contact(point)?.is_none() {
            return Ok(Pulse::Quiet);
        }
        let destination = scene.point_in_object_layer(point, self.target)?;
        self.glide = Some(MoveTo::new(self.target, destination, self.duration).eased());
        Ok(Pulse::Quiet)
    }
}

impl Effect for GlideToPress {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        match event {
            SceneEvent::Pointer(PointerEvent::Start(point)) => self.press(*point, scene),
            SceneEvent::Frame(frame) => {
                let Some(glide) = self.glide.as_mut() else {
                    return Ok(Pulse::Quiet);
                };
                let pulse = glide.advance(frame, scene)?;
                if pulse.finishes() {
                    self.glide = None;
                }
                Ok(Pulse::from_change(pulse.renders()))
            }
            _ => Ok(Pulse::Quiet),
        }
    }
}

// =============================================================
// Layer drags
// =============================================================

/// The press a layer drag follows.
///
/// Only the most recent accepted press moves the layer: a newer press takes
/// over, samples from older ones are ignored. The first sample of a press
/// fixes its layer-space anchor; later samples yield the displacement of the
/// pointer from that anchor, which is exactly the translation that brings
/// the anchor back under the pointer. Rejected presses never take over.
#[derive(Debug, Clone, Default)]
struct LayerGrip {
    current: Option<(u64, Point)>,
    rejected: Vec<u64>,
}

impl LayerGrip {
    fn follow<F>(&mut self, drag: &Drag, layer: usize, scene: &Scene, accept: F) -> Result<Option<Point>, SceneError>
    where
        F: FnOnce(&Scene) -> Result<bool, SceneError>,
    {
        if self.rejected.contains(&drag.session) {
            return Ok(None);
        }
        let point = scene.point_in_layer(drag.point, layer)?;
        match self.current {
            Some((session, anchor)) if session == drag.session => Ok(Some(anchor.vector_to(point))),
            Some((session, _)) if session > drag.session => Ok(None),
            _ => {
                if accept(scene)? {
                    self.current = Some((drag.session, point));
                } else {
                    self.rejected.push(drag.session);
                }
                Ok(None)
            }
        }
    }

    fn release(&mut self) {
        self.current = None;
        self.rejected.clear();
    }
}

fn translate_layers(scene: &mut Scene, layers: impl IntoIterator<Item = usize>, delta: Point) -> Result<Pulse, SceneError> {
    if delta == Point::ORIGIN {
        return Ok(Pulse::Quiet);
    }
    let shift = Affine::translation(delta);
    for layer in layers {
        scene.transform_layer(layer, &shift)?;
    }
    Ok(Pulse::Render)
}

// =============================================================
// PanLayer
// =============================================================

/// Pans a layer (and its dependents) while the pointer drags empty space.
///
/// The layer point under the first drag sample stays under the pointer for
/// the rest of the press; dependent layers receive the same translation.
#[derive(Debug, Clone)]
pub struct PanLayer {
    layer: usize,
    dependents: Vec<usize>,
    grip: LayerGrip,
}

impl PanLayer {
    #[must_use]
    pub fn new(layer: usize) -> Self {
        Self { layer, dependents: Vec::new(), grip: LayerGrip::default() }
    }

    #[must_use]
    pub fn with_dependents(mut self, dependents: impl IntoIterator<Item = usize>) -> Self {
        self.dependents.extend(dependents);
        self
    }

    fn drag(&mut self, drag: &Drag, scene: &mut Scene) -> Result<Pulse, SceneError> {
        if drag.contact.is_some() {
            return Ok(Pulse::Quiet);
        }
        let Some(delta) = self.grip.follow(drag, self.layer, scene, |_| Ok(true))? else {
            return Ok(Pulse::Quiet);
        };
        let layers = std::iter::once(self.layer).chain(self.dependents.iter().copied());
        translate_layers(scene, layers, delta)
    }
}

impl Effect for PanLayer {
    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        match event {
            SceneEvent::Pointer(PointerEvent::Drag(drag)) => self.drag(drag, scene),
            SceneEvent::Pointer(PointerEvent::End(_)) => {
                self.grip.release();
                Ok(Pulse::Quiet)
            }
            _ => Ok(Pulse::Quiet),
        }
    }
}

// =============================================================
// ShiftLayer
// =============================================================

/// Slides a layer along one axis while the pointer drags.
///
/// A press only shifts the layer when nothing in a layer above it lies under
/// the press point, so objects stacked on top keep their own drags.
#[derive(Debug, Clone)]
pub struct ShiftLayer {
    layer: usize,
    axis: Axis,
    grip: LayerGrip,
}

impl ShiftLayer {
    #[must_use]
    pub fn new(layer: usize, axis: Axis) -> Self {
        Self { layer, axis, grip: LayerGrip::default() }
    }

    fn drag(&mut self, drag: &Drag, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let layer = self.layer;
        let origin = drag.origin;
        let accept = |scene: &Scene| -> Result<bool, SceneError> {
            Ok(scene.point_without_contact_above_layer(origin, layer)?.is_some())
        };
        let Some(delta) = self.grip.follow(drag, layer, scene, accept)? else {
            return Ok(Pulse::Quiet);
        };
        translate_layers(scene, [layer], self.axis.project(delta))
    }
}

impl Effect for ShiftLayer {
    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        match event {
            SceneEvent::Pointer(PointerEvent::Drag(drag)) => self.drag(drag, scene),
            SceneEvent::Pointer(PointerEvent::End(_)) => {
                self.grip.release();
                Ok(Pulse::Quiet)
            }
            _ => Ok(Pulse::Quiet),
        }
    }
}

// =============================================================
// FocusLayer
// =============================================================

/// Eases a layer's translation coefficients `(e, f)` to a focus point,
/// keeping its scale and rotation, then finishes.
#[derive(Debug, Clone)]
pub struct FocusLayer {
    layer: usize,
    focus: Point,
    duration: f64,
    run: Option<Run>,
}

impl FocusLayer {
    #[must_use]
    pub fn new(layer: usize, focus: Point) -> Self {
        Self { layer, focus, duration: FOCUS_MS, run: None }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = duration_ms;
        self
    }
}

impl Effect for FocusLayer {
    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let Some(tick) = frame_of(event).and_then(|frame| frame.layer(self.layer)) else {
            return Ok(Pulse::Quiet);
        };
        let [a, b, c, d, e, f] = scene.layer_coefficients(self.layer)?;
        let run = match self.run {
            Some(_) if tick.is_frozen() => return Ok(Pulse::Quiet),
            Some(run) => run,
            None => {
                let movement = Movement::new(Point::new(e, f), self.focus, self.duration).eased();
                let run = Run { movement, started: tick.time };
                self.run = Some(run);
                if tick.is_frozen() {
                    return Ok(Pulse::Quiet);
                }
                run
            }
        };
        let (point, done) = run.point(tick);
        scene.set_layer_coefficients(self.layer, [a, b, c, d, point.x, point.y])?;
        Ok(if done { Pulse::RenderAndFinish } else { Pulse::Render })
    }
}

// =============================================================
// CollisionWatch
// =============================================================

/// Calls `handler(other, scene)` for every collision pair involving the
/// target. The handler returns whether it changed the scene, and may remove
/// objects, the target included.
pub struct CollisionWatch<F> {
    target: ObjectId,
    handler: F,
}

impl<F> CollisionWatch<F>
where
    F: FnMut(ObjectId, &mut Scene) -> Result<bool, SceneError>,
{
    #[must_use]
    pub fn new(target: ObjectId, handler: F) -> Self {
        Self { target, handler }
    }
}

impl<F> Effect for CollisionWatch<F>
where
    F: FnMut(ObjectId, &mut Scene) -> Result<bool, SceneError>,
{
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn wants_collisions(&self) -> bool {
        true
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        let SceneEvent::Collisions(pairs) = event else {
            return Ok(Pulse::Quiet);
        };
        let mut changed = false;
        for &(a, b) in *pairs {
            let other = if a == self.target {
                b
            } else if b == self.target {
                a
            } else {
                continue;
            };
            if !scene.contains(self.target) {
                break;
            }
            if !scene.contains(other) {
                continue;
            }
            changed |= (self.handler)(other, scene)?;
        }
        Ok(Pulse::from_change(changed))
    }
}

// =============================================================
// EffectSwitcher
// =============================================================

/// Pointer gesture that advances an [`EffectSwitcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Press,
    Click,
    Hold,
    DoubleClick,
    OneClick,
}

impl Trigger {
    fn point(self, event: &PointerEvent) -> Option<Point> {
        match (self, event) {
            (Self::Press, PointerEvent::Start(p))
            | (Self::Click, PointerEvent::Click(p))
            | (Self::Hold, PointerEvent::Hold(p))
            | (Self::DoubleClick, PointerEvent::DoubleClick(p))
            | (Self::OneClick, PointerEvent::OneClick(p)) => Some(*p),
            _ => None,
        }
    }
}

/// Stand-in that keeps a lone switched effect toggling on and off.
struct Idle;

impl Effect for Idle {
    fn on_event(&mut self, _event: &SceneEvent<'_>, _scene: &mut Scene) -> Result<Pulse, SceneError> {
        Ok(Pulse::Quiet)
    }
}

/// Runs one of several effects at a time, moving to the next (cyclically)
/// whenever the trigger gesture lands on the target.
///
/// Only the active effect receives events. A lone effect alternates with an
/// idle slot, so the trigger toggles it. An effect that finishes leaves the
/// switcher idle until the next trigger, and stays finished when its turn
/// comes again. Switched effects are expected to act on the switcher's
/// target.
pub struct EffectSwitcher {
    target: ObjectId,
    trigger: Trigger,
    effects: Vec<Box<dyn Effect>>,
    next: usize,
    active: Option<usize>,
}

impl EffectSwitcher {
    #[must_use]
    pub fn new(target: ObjectId, trigger: Trigger, mut effects: Vec<Box<dyn Effect>>) -> Self {
        while effects.len() < 2 {
            effects.push(Box::new(Idle));
        }
        Self { target, trigger, effects, next: 0, active: None }
    }

    /// Run the first effect right away instead of waiting for a trigger.
    #[must_use]
    pub fn started(mut self) -> Self {
        self.switch();
        self
    }

    fn switch(&mut self) {
        let index = self.next % self.effects.len();
        self.next += 1;
        self.active = Some(index);
        tracing::debug!(target = %self.target, slot = index, "effect switched");
    }

    fn triggered(&self, event: &SceneEvent<'_>, scene: &Scene) -> Result<bool, SceneError> {
        let Some(point) = (match event {
            SceneEvent::Pointer(pointer) => self.trigger.point(pointer),
            _ => None,
        }) else {
            return Ok(false);
        };
        Ok(scene.check_contact(point)?.iter().any(|contact| contact.object == self.target))
    }
}

impl Effect for EffectSwitcher {
    fn target(&self) -> Option<ObjectId> {
        Some(self.target)
    }

    fn wants_collisions(&self) -> bool {
        self.active.and_then(|index| self.effects.get(index)).is_some_and(|effect| effect.wants_collisions())
    }

    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError> {
        if self.triggered(event, scene)? {
            self.switch();
            return Ok(Pulse::Quiet);
        }
        let Some(index) = self.active else {
            return Ok(Pulse::Quiet);
        };
        let Some(effect) = self.effects.get_mut(index) else {
            return Ok(Pulse::Quiet);
        };
        let pulse = effect.on_event(event, scene)?;
        if pulse.finishes() {
            *effect = Box::new(Idle);
            self.active = None;
        }
        Ok(Pulse::from_change(pulse.renders()))
    }
}
