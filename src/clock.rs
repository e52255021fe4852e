//! Frame clocks: paced, pausable and sleepable logical time.
//!
//! A [`FrameClock`] integrates the deltas of a source time (the host's
//! animation-frame timestamp for the root clock, the parent's logical time for
//! a layer clock) through three adapters applied in order:
//!
//! 1. **pace** multiplies every delta by a factor (`0` freezes motion),
//! 2. **pause** is a second pace stage reserved for user pause/resume,
//! 3. **sleep** drops ticks entirely.
//!
//! A paused clock still ticks, with `delta == 0`; time-driven effects treat
//! such a frozen tick as "nothing to do" so it never causes a re-render. A
//! sleeping clock yields no tick at all and does not integrate time, so it
//! resumes exactly where it stopped.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

/// One tick of a frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Cumulative logical time in milliseconds. Never decreases.
    pub time: f64,
    /// Logical milliseconds elapsed since the previous tick.
    pub delta: f64,
}

impl Tick {
    /// A tick that carries no motion (paused or paced to zero).
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.delta <= 0.0
    }
}

/// Paced, pausable and sleepable logical clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    pace: f64,
    paused: bool,
    asleep: bool,
    last_source: Option<f64>,
    time: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self { pace: 1.0, paused: false, asleep: false, last_source: None, time: 0.0 }
    }

    /// Feed the next source time and get this clock's tick for it.
    ///
    /// The first source value only establishes the phase and yields a tick at
    /// `time == 0` with zero delta. Source values that go backwards are
    /// treated as no elapsed time. Returns `None` while asleep.
    pub fn advance(&mut self, source: f64) -> Option<Tick> {
        let raw = match self.last_source {
            Some(prev) => (source - prev).max(0.0),
            None => 0.0,
        };
        self.last_source = Some(self.last_source.map_or(source, |prev| prev.max(source)));

        if self.asleep {
            return None;
        }

        let factor = if self.paused { 0.0 } else { self.pace };
        let delta = raw * factor;
        self.time += delta;
        Some(Tick { time: self.time, delta })
    }

    /// Current cumulative logical time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.time
    }

    /// Scale all future deltas by `factor`. Negative or non-finite factors
    /// are treated as `0` so time never runs backwards.
    pub fn pace(&mut self, factor: f64) {
        self.pace = if factor.is_finite() && factor > 0.0 { factor } else { 0.0 };
    }

    #[must_use]
    pub fn current_pace(&self) -> f64 {
        self.pace
    }

    /// Freeze motion while still ticking.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Lift a pause without waking a sleeping clock.
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Stop emitting ticks.
    pub fn sleep(&mut self) {
        self.asleep = true;
    }

    #[must_use]
    pub fn asleep(&self) -> bool {
        self.asleep
    }

    /// Wake up and unpause. The pace factor is left unchanged.
    pub fn resume(&mut self) {
        self.asleep = false;
        self.paused = false;
    }

    /// Forget the source phase so the next `advance` starts a new one.
    pub fn reset_phase(&mut self) {
        self.last_source = None;
    }
}
