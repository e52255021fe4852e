//! Shared numeric constants for the stage crate.

// ── Gestures ────────────────────────────────────────────────────

/// Maximum time (ms) between pointer-down and pointer-up for a click.
/// Also the hold delay and the double-click window.
pub const CLICK_TIMEOUT_MS: f64 = 300.0;

/// Squared distance (px²) a pointer may travel and still count as a click.
pub const CLICK_EPSILON_SQ: f64 = 25.0;

// ── Effects ─────────────────────────────────────────────────────

/// Duration of the spring-back movement after an invalid drop.
pub const SPRING_BACK_MS: f64 = 500.0;

/// Duration of a layer focus pan.
pub const FOCUS_MS: f64 = 500.0;

/// Duration of the glide towards a press on empty space.
pub const GLIDE_MS: f64 = 500.0;

/// Default period (ms) of spin, oscillate and follow-vectors effects.
pub const DEFAULT_PERIOD_MS: f64 = 1000.0;

// ── Render ──────────────────────────────────────────────────────

/// Width of the FPS counter bucket.
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Fill used to clear the surface before each render.
pub const DEFAULT_BACKGROUND: &str = "black";

// ── Math ────────────────────────────────────────────────────────

/// Tolerance for treating a determinant as zero.
pub const DETERMINANT_EPSILON: f64 = 1e-12;
