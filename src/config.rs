//! Engine configuration: gesture timing, background, FPS window, spring-back.
//!
//! Values come from [`Default`] (the constants in [`crate::consts`]), from a
//! JSON document, or from `STAGE_*` environment variables for native hosts
//! and test harnesses. Missing or unparsable variables fall back to defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{CLICK_EPSILON_SQ, CLICK_TIMEOUT_MS, DEFAULT_BACKGROUND, FPS_WINDOW_MS, SPRING_BACK_MS};
use crate::error::SceneError;

/// Timing constants shared by every gesture race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Click window, hold delay and double-click window, in milliseconds.
    pub click_timeout_ms: f64,
    /// Squared distance (px²) a pointer may travel and still click.
    pub click_epsilon_sq: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self { click_timeout_ms: CLICK_TIMEOUT_MS, click_epsilon_sq: CLICK_EPSILON_SQ }
    }
}

impl GestureConfig {
    /// Reject degenerate timing.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidTiming`] if either constant is not finite
    /// or not strictly positive.
    pub fn validate(&self) -> Result<(), SceneError> {
        positive("click_timeout_ms", self.click_timeout_ms)?;
        positive("click_epsilon_sq", self.click_epsilon_sq)
    }
}

/// Everything the engine reads at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gesture: GestureConfig,
    /// Fill used to clear the surface before each render.
    pub background: String,
    /// Width of an FPS bucket in milliseconds.
    pub fps_window_ms: f64,
    /// Duration of the spring-back after an invalid drop.
    pub spring_back_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            background: DEFAULT_BACKGROUND.to_owned(),
            fps_window_ms: FPS_WINDOW_MS,
            spring_back_ms: SPRING_BACK_MS,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] on malformed JSON, or the validation
    /// error of [`EngineConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let config: Self = serde_json::from_str(json).map_err(|e| SceneError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `STAGE_*` environment variables over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gesture: GestureConfig {
                click_timeout_ms: env_parse("STAGE_CLICK_TIMEOUT_MS", defaults.gesture.click_timeout_ms),
                click_epsilon_sq: env_parse("STAGE_CLICK_EPSILON_SQ", defaults.gesture.click_epsilon_sq),
            },
            background: env_string("STAGE_BACKGROUND", defaults.background),
            fps_window_ms: env_parse("STAGE_FPS_WINDOW_MS", defaults.fps_window_ms),
            spring_back_ms: env_parse("STAGE_SPRING_BACK_MS", defaults.spring_back_ms),
        }
    }

    /// # Errors
    ///
    /// Returns [`SceneError::InvalidTiming`] for non-positive or non-finite
    /// timing values.
    pub fn validate(&self) -> Result<(), SceneError> {
        self.gesture.validate()?;
        positive("fps_window_ms", self.fps_window_ms)?;
        positive("spring_back_ms", self.spring_back_ms)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SceneError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidTiming { name, value })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw = %raw, "ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_string(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => default,
    }
}
