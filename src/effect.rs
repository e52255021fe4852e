//! Effects and the scheduler that drives them.
//!
//! An [`Effect`] is a long-running, cancellable mutator of the scene. The
//! engine feeds every playing effect the same [`SceneEvent`]s (frame ticks,
//! recognized pointer events and per-frame collision snapshots); each call
//! answers with a [`Pulse`] saying whether it wants a render and whether it
//! is done.
//!
//! Pulses are not rendered one by one. The scheduler only reports whether any
//! effect asked for a render during a dispatch, and the engine renders at most
//! once per animation frame.
//!
//! An effect with a target is cancelled the moment that target leaves the
//! scene, including when a sibling effect removes it halfway through a
//! dispatch: later effects in the same dispatch never see it again.

#[cfg(test)]
#[path = "effect_test.rs"]
mod effect_test;

use std::fmt;

use crate::clock::Tick;
use crate::error::SceneError;
use crate::input::PointerEvent;
use crate::object::ObjectId;
use crate::scene::Scene;

/// Answer of an effect to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    /// Nothing changed.
    Quiet,
    /// The scene changed; render on the next frame.
    Render,
    /// The scene changed and the effect is done.
    RenderAndFinish,
    /// Done without a final change.
    Finish,
}

impl Pulse {
    #[must_use]
    pub fn renders(self) -> bool {
        matches!(self, Self::Render | Self::RenderAndFinish)
    }

    #[must_use]
    pub fn finishes(self) -> bool {
        matches!(self, Self::Finish | Self::RenderAndFinish)
    }

    /// `Render` when `changed`, `Quiet` otherwise.
    #[must_use]
    pub fn from_change(changed: bool) -> Self {
        if changed { Self::Render } else { Self::Quiet }
    }
}

/// Ticks of one animation frame: the root clock and every layer clock.
/// `None` means that clock is asleep this frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub root: Option<Tick>,
    pub layers: Vec<Option<Tick>>,
}

impl Frame {
    /// Tick of layer `n`, if it exists and is awake.
    #[must_use]
    pub fn layer(&self, n: usize) -> Option<Tick> {
        self.layers.get(n).copied().flatten()
    }

    /// Tick of the layer that currently holds `id`.
    #[must_use]
    pub fn tick_for(&self, scene: &Scene, id: ObjectId) -> Option<Tick> {
        scene.find_layer(id).and_then(|n| self.layer(n))
    }
}

/// Everything an effect can react to.
#[derive(Debug, Clone, Copy)]
pub enum SceneEvent<'a> {
    Frame(&'a Frame),
    Pointer(&'a PointerEvent),
    /// Pairs currently overlapping in enabled contact layers, `(back, front)`.
    Collisions(&'a [(ObjectId, ObjectId)]),
}

/// A unit of continuous, event-driven scene mutation.
pub trait Effect {
    /// The object this effect mutates. The effect is cancelled when it is
    /// removed from the scene.
    fn target(&self) -> Option<ObjectId> {
        None
    }

    /// Whether the engine should compute collision snapshots for this effect.
    fn wants_collisions(&self) -> bool {
        false
    }

    /// React to one event.
    ///
    /// # Errors
    ///
    /// Any [`SceneError`] raised while mutating the scene. The error aborts
    /// the current dispatch.
    fn on_event(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<Pulse, SceneError>;
}

/// Handle of a playing effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx{}", self.0)
    }
}

struct Slot {
    id: EffectId,
    target: Option<ObjectId>,
    effect: Box<dyn Effect>,
    cancelled: bool,
}

/// Merges the pulses of every playing effect.
#[derive(Default)]
pub struct EffectScheduler {
    slots: Vec<Slot>,
    next_id: u64,
}

impl fmt::Debug for EffectScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectScheduler").field("playing", &self.len()).finish()
    }
}

impl EffectScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of effects still playing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.cancelled).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_playing(&self, id: EffectId) -> bool {
        self.slots.iter().any(|slot| slot.id == id && !slot.cancelled)
    }

    pub fn play(&mut self, effect: Box<dyn Effect>) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        let target = effect.target();
        tracing::debug!(effect = %id, target = ?target, "effect playing");
        self.slots.push(Slot { id, target, effect, cancelled: false });
        id
    }

    /// Stop one effect. Returns `false` if it was not playing.
    pub fn cancel(&mut self, id: EffectId) -> bool {
        match self.slots.iter_mut().find(|slot| slot.id == id && !slot.cancelled) {
            Some(slot) => {
                slot.cancelled = true;
                tracing::debug!(effect = %id, "effect cancelled");
                true
            }
            None => false,
        }
    }

    /// Stop every effect targeting `target`. Returns how many were stopped.
    pub fn cancel_target(&mut self, target: ObjectId) -> usize {
        let mut count = 0;
        for slot in self.slots.iter_mut().filter(|slot| !slot.cancelled && slot.target == Some(target)) {
            slot.cancelled = true;
            count += 1;
        }
        if count > 0 {
            tracing::debug!(%target, count, "effects cancelled by target removal");
        }
        count
    }

    /// Drop every effect.
    pub fn clear(&mut self) {
        if !self.slots.is_empty() {
            tracing::debug!(count = self.len(), "effects dropped");
        }
        self.slots.clear();
    }

    #[must_use]
    pub fn wants_collisions(&self) -> bool {
        self.slots.iter().any(|slot| !slot.cancelled && slot.effect.wants_collisions())
    }

    /// Deliver `event` to every playing effect, in play order. Returns
    /// whether any of them asked for a render.
    ///
    /// After each delivery, objects removed from the scene cancel the effects
    /// that target them. Finished and cancelled effects are swept at the end,
    /// also when an effect fails.
    ///
    /// # Errors
    ///
    /// The first error returned by an effect.
    pub fn dispatch(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<bool, SceneError> {
        self.sync_removals(scene);
        let result = self.deliver(event, scene);
        self.slots.retain(|slot| !slot.cancelled);
        result
    }

    fn deliver(&mut self, event: &SceneEvent<'_>, scene: &mut Scene) -> Result<bool, SceneError> {
        let mut render = false;
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.cancelled {
                continue;
            }
            let pulse = slot.effect.on_event(event, scene);
            let id = slot.id;
            let pulse = match pulse {
                Ok(pulse) => pulse,
                Err(err) => {
                    self.sync_removals(scene);
                    return Err(err);
                }
            };
            render |= pulse.renders();
            if pulse.finishes() {
                self.slots[index].cancelled = true;
                tracing::debug!(effect = %id, "effect finished");
            }
            self.sync_removals(scene);
        }
        Ok(render)
    }

    /// Cancel effects whose target has left the scene.
    pub(crate) fn sync_removals(&mut self, scene: &mut Scene) {
        for removed in scene.take_removed() {
            self.cancel_target(removed);
        }
    }
}
