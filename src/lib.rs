//! Layered 2D scene engine with contact detection, pointer gestures and
//! frame-clocked effects.
//!
//! The crate compiles to WebAssembly and drives a browser canvas, but its core
//! is surface-agnostic: a [`scene::Scene`] of affine-transformed layers holds
//! the objects, [`input`] turns raw pointer events into gestures, [`effect`]
//! runs cancellable time-driven mutators, and [`engine::Engine`] ties them to
//! the host's animation frames with at most one render per frame.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geom`] | `Point`, `Rect` and the `Affine` transform algebra |
//! | [`clock`] | Paced, pausable, sleepable frame clocks |
//! | [`object`] | Object handles and the `Drawable`/`Positioned`/`Contactable` capabilities |
//! | [`shape`] | Ready-made contactable shapes |
//! | [`layer`] | Layers, coordinate mapping, two-phase contact and collision |
//! | [`contact`] | Contact results and cross-layer queries |
//! | [`input`] | Gesture recognition (click, hold, double-click, drag) |
//! | [`effect`] | The `Effect` trait and the pulse-merging scheduler |
//! | [`fx`] | Built-in effects |
//! | [`scene`] | Layers, object arena and clocks |
//! | [`engine`] | Lifecycle, input dispatch, frame loop and FPS |
//! | [`render`] | Drawing-surface contract and the render pass |
//! | [`web`] | Canvas 2D surface and DOM input normalization |
//! | [`config`] | Engine and gesture configuration |
//! | [`consts`] | Shared numeric constants |
//! | [`error`] | `SceneError` |

pub mod clock;
pub mod config;
pub mod consts;
pub mod contact;
pub mod effect;
pub mod engine;
pub mod error;
pub mod fx;
pub mod geom;
pub mod input;
pub mod layer;
pub mod object;
pub mod render;
pub mod scene;
pub mod shape;
pub mod web;

#[cfg(test)]
#[path = "testkit_test.rs"]
pub(crate) mod testkit;
