//! Pointer gesture recognition.
//!
//! Raw `start`/`move`/`end` points (already in surface pixels) go in; raw
//! events plus derived gestures come out. Every gesture is a race between a
//! timer and a pointer event, modelled as an explicit state machine: an armed
//! race holds its deadline, and whichever branch wins disarms it. Nothing is
//! left pending after a branch wins, so there are no timers to leak.
//!
//! | Gesture | Armed on | Wins when | Loses when |
//! |---------|----------|-----------|------------|
//! | click | `start` at P | next `end` at Q with `d²(P, Q) < ε` | timeout, or `end` too far |
//! | hold | `start` at P | timeout (emits P) | `end`, or a `move` with `d²(P, M) > ε` |
//! | double-click | each click | next `end` (emits it) | timeout |
//! | one-click | each click | timeout, unless the previous race ended on an `end` | next `end` |
//! | drag | `start` at O | every `move` until the next `end` | |
//!
//! A new `start` re-arms the click and hold races, replacing the pending
//! ones. Drags are independent: each `start` adds a session and the next
//! `end` closes all of them.
//!
//! The recognizer has no clock of its own. Callers pass the current time with
//! each event and call [`GestureRecognizer::advance`] so expired races fire;
//! [`GestureRecognizer::next_deadline`] tells a host when that is due.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::config::GestureConfig;
use crate::contact::Contact;
use crate::error::SceneError;
use crate::geom::Point;

/// A drag sample: where it began, what it grabbed, where the pointer is now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub origin: Point,
    /// Front-most contact at the origin when the drag began.
    pub contact: Option<Contact>,
    pub point: Point,
    /// Press that opened this drag. Later presses get larger numbers.
    pub session: u64,
}

/// Raw pointer events and the gestures derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Start(Point),
    Move(Point),
    End(Point),
    /// Pointer released close to where it went down, within the timeout.
    Click(Point),
    /// Pointer held still for the timeout.
    Hold(Point),
    /// A second release following a click within the timeout.
    DoubleClick(Point),
    /// A click not followed by a second one.
    OneClick(Point),
    Drag(Drag),
}

/// A timer race armed at `point`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Race {
    point: Point,
    deadline: f64,
}

/// How a post-click race ended, tracked one step back to tell a lone click
/// from the second click of a double.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    /// Timed out: the click stood alone.
    Lone,
    /// Ended by a release: that release was a double-click.
    Second,
    /// Timed out right after a `Second`: the trailing click of a double.
    Swallowed,
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    id: u64,
    origin: Point,
    contact: Option<Contact>,
}

#[derive(Debug, Clone, Copy)]
enum Timer {
    Click,
    Hold,
    FollowUp,
}

/// Time-windowed gesture state machine.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    enabled: bool,
    click: Option<Race>,
    hold: Option<Race>,
    follow_up: Option<Race>,
    last_tag: Option<Tag>,
    drags: Vec<DragSession>,
    sessions: u64,
}

impl GestureRecognizer {
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidTiming`] for degenerate timing constants.
    pub fn new(config: GestureConfig) -> Result<Self, SceneError> {
        config.validate()?;
        Ok(Self {
            config,
            enabled: true,
            click: None,
            hold: None,
            follow_up: None,
            last_tag: None,
            drags: Vec::new(),
            sessions: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Let pointer events through again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Drop every incoming `start`, `move` and `end` until re-enabled.
    /// Races already armed still time out.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Earliest pending deadline, if any race is armed.
    #[must_use]
    pub fn next_deadline(&self) -> Option<f64> {
        [self.click, self.hold, self.follow_up]
            .into_iter()
            .flatten()
            .map(|race| race.deadline)
            .reduce(f64::min)
    }

    /// Whether nothing is armed and no drag is open.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.next_deadline().is_none() && self.drags.is_empty()
    }

    /// Fire every race whose deadline is at or before `now`, earliest first.
    pub fn advance(&mut self, now: f64) -> Vec<PointerEvent> {
        let mut due: Vec<(f64, Timer)> = [
            (self.click, Timer::Click),
            (self.hold, Timer::Hold),
            (self.follow_up, Timer::FollowUp),
        ]
        .into_iter()
        .filter_map(|(race, timer)| race.filter(|r| r.deadline <= now).map(|r| (r.deadline, timer)))
        .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut out = Vec::new();
        for (_, timer) in due {
            match timer {
                Timer::Click => {
                    self.click = None;
                }
                Timer::Hold => {
                    if let Some(race) = self.hold.take() {
                        tracing::trace!(x = race.point.x, y = race.point.y, "hold");
                        out.push(PointerEvent::Hold(race.point));
                    }
                }
                Timer::FollowUp => {
                    if let Some(race) = self.follow_up.take() {
                        if self.settle(Tag::Lone) {
                            tracing::trace!(x = race.point.x, y = race.point.y, "one click");
                            out.push(PointerEvent::OneClick(race.point));
                        }
                    }
                }
            }
        }
        out
    }

    /// Pointer went down at `point`. `contact` is the front-most contact
    /// there, which every drag sample of this session carries.
    pub fn start(&mut self, point: Point, now: f64, contact: Option<Contact>) -> Vec<PointerEvent> {
        let mut out = self.advance(now);
        if !self.enabled {
            return out;
        }
        out.push(PointerEvent::Start(point));
        let race = Race { point, deadline: now + self.config.click_timeout_ms };
        self.click = Some(race);
        self.hold = Some(race);
        self.sessions += 1;
        self.drags.push(DragSession { id: self.sessions, origin: point, contact });
        out
    }

    pub fn moved(&mut self, point: Point, now: f64) -> Vec<PointerEvent> {
        let mut out = self.advance(now);
        if !self.enabled {
            return out;
        }
        out.push(PointerEvent::Move(point));
        if self.hold.is_some_and(|race| race.point.square_distance(point) > self.config.click_epsilon_sq) {
            self.hold = None;
        }
        out.extend(
            self.drags
                .iter()
                .map(|session| {
                    PointerEvent::Drag(Drag { origin: session.origin, contact: session.contact, point, session: session.id })
                }),
        );
        out
    }

    pub fn end(&mut self, point: Point, now: f64) -> Vec<PointerEvent> {
        let mut out = self.advance(now);
        if !self.enabled {
            return out;
        }
        out.push(PointerEvent::End(point));

        // The follow-up race was armed by an earlier click, so it sees this
        // release before the click race that this release may complete.
        if self.follow_up.take().is_some() {
            self.settle(Tag::Second);
            tracing::trace!(x = point.x, y = point.y, "double click");
            out.push(PointerEvent::DoubleClick(point));
        }

        self.hold = None;
        self.drags.clear();

        if let Some(race) = self.click.take() {
            if race.point.square_distance(point) < self.config.click_epsilon_sq {
                tracing::trace!(x = race.point.x, y = race.point.y, "click");
                out.push(PointerEvent::Click(race.point));
                self.follow_up = Some(Race { point: race.point, deadline: now + self.config.click_timeout_ms });
            }
        }
        out
    }

    /// Drop every armed race and open drag.
    pub fn reset(&mut self) {
        self.click = None;
        self.hold = None;
        self.follow_up = None;
        self.last_tag = None;
        self.drags.clear();
    }

    /// Record how a follow-up race ended. Returns `true` when it is a lone
    /// click that should be reported.
    fn settle(&mut self, tag: Tag) -> bool {
        let tag = if self.last_tag == Some(Tag::Second) && tag == Tag::Lone { Tag::Swallowed } else { tag };
        self.last_tag = Some(tag);
        tag == Tag::Lone
    }
}
