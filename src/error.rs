//! Error type shared by every fallible scene operation.
//!
//! Configuration errors (bad layer index, unknown object, effect played on a
//! dead engine, degenerate gesture timing) and numeric degeneracies (singular
//! transforms) are reported here. Absence of a contact or a collision is never
//! an error; those queries return empty collections.

use crate::object::ObjectId;

/// Error returned by scene, engine and transform operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// The layer index is outside `0..layer_count`.
    #[error("invalid layer {0}")]
    InvalidLayer(usize),
    /// The object handle is not registered in the scene ("unknown graph").
    #[error("unknown graph {0}")]
    UnknownObject(ObjectId),
    /// An effect was played before `init()` or after `teardown()`.
    #[error("invalid state: effects cannot be played before initialization")]
    NotInitialized,
    /// Inversion of a transform whose determinant is zero.
    #[error("singular transform (determinant {determinant})")]
    SingularTransform {
        /// The offending determinant `ad - cb`.
        determinant: f64,
    },
    /// Gesture race built with a non-positive or non-finite constant.
    #[error("invalid gesture timing: {name} = {value}")]
    InvalidTiming {
        /// Which constant was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The drawing surface rejected a call.
    #[error("surface error: {0}")]
    Surface(String),
    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}
