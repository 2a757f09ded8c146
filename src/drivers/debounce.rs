//! Contact debouncing for the end-stop reed switches and push-buttons.
//!
//! ## Hardware
//!
//! All inputs are active-low with pull-ups and fire an any-edge GPIO
//! interrupt.  The ISR only timestamps the edge (see [`crate::events`]);
//! the input task feeds edges into [`Debouncer::confirm`] and calls
//! [`Debouncer::poll`] every few milliseconds to run deferred re-reads.
//! Neither call blocks.
//!
//! ## Strategies
//!
//! | Strategy   | On edge                                         | On deadline           |
//! |------------|-------------------------------------------------|-----------------------|
//! | `Suppress` | first edge opens a lockout, later ones ignored  | accept the read value |
//! | `Confirm`  | (re)arm a re-read `quiet` after every edge      | accept the read value |
//!
//! Both sample the final settled level and never report on the edge
//! itself, so a burst of bounces produces at most one logical transition
//! per settled change and a glitch that settles back produces none.  Edge
//! counting is never used: the number of reported edges during a bounce
//! is not reliable.

use serde::{Deserialize, Serialize};

/// A confirmed logical change of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Asserted,
    Released,
}

impl Transition {
    pub const fn from_level(asserted: bool) -> Self {
        if asserted {
            Self::Asserted
        } else {
            Self::Released
        }
    }

    pub const fn is_asserted(self) -> bool {
        matches!(self, Self::Asserted)
    }
}

/// Which debounce implementation an input uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceStrategy {
    /// Fixed lockout from the first edge, then one read.
    Suppress,
    /// Delayed re-read confirmation, re-armed by every edge (preferred).
    Confirm,
}

/// Per-input debounce bookkeeping.  Lives for the whole process.
pub struct Debouncer {
    strategy: DebounceStrategy,
    quiet_ms: u32,
    /// Last confirmed logical level.
    confirmed: bool,
    /// Start of the interval after which a re-read is due.
    pending_since: Option<u32>,
}

impl Debouncer {
    /// `initial` is the level read when the input is registered.
    pub fn new(strategy: DebounceStrategy, quiet_ms: u32, initial: bool) -> Self {
        Self {
            strategy,
            quiet_ms,
            confirmed: initial,
            pending_since: None,
        }
    }

    /// Last confirmed logical level.
    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    /// Whether a deferred re-read is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Feed a raw edge.  Edges never confirm anything by themselves; the
    /// level is read by [`Debouncer::poll`] once the interval has passed.
    /// Always `None`, kept as `Option` so callers treat every input path
    /// the same way.
    pub fn confirm(&mut self, _level: bool, now_ms: u32) -> Option<Transition> {
        let rearm = match (self.strategy, self.pending_since) {
            (_, None) | (DebounceStrategy::Confirm, Some(_)) => true,
            // Lockout already over but not yet polled: this edge starts a
            // new burst, so its own lockout applies.
            (DebounceStrategy::Suppress, Some(since)) => {
                now_ms.wrapping_sub(since) >= self.quiet_ms
            }
        };
        if rearm {
            self.pending_since = Some(now_ms);
        }
        None
    }

    /// Run a due re-read.  `level` is the current pin level.
    pub fn poll(&mut self, level: bool, now_ms: u32) -> Option<Transition> {
        let since = self.pending_since?;
        if now_ms.wrapping_sub(since) < self.quiet_ms {
            return None;
        }
        self.pending_since = None;
        self.accept(level)
    }

    /// Accept `level` outside of any edge (periodic re-check).  Skipped
    /// while a re-read is pending.
    pub fn resync(&mut self, level: bool) -> Option<Transition> {
        if self.is_pending() {
            return None;
        }
        self.accept(level)
    }

    fn accept(&mut self, level: bool) -> Option<Transition> {
        if level == self.confirmed {
            return None;
        }
        self.confirmed = level;
        Some(Transition::from_level(level))
    }
}
