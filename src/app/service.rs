//! Input service: debouncers → tracker / arbiter routing.
//!
//! [`InputService`] runs on the input task.  It owns one [`Debouncer`] per
//! monitored input and the [`SensorStateTracker`].  Confirmed sensor
//! transitions update the tracker, and every published door state is also
//! forwarded to the arbiter so it can cut the motor at the end-stop.
//! Confirmed button presses become button-origin commands.
//!
//! ```text
//!  RawEdge ──▶ Debouncer[5] ──┬─ sensor ──▶ SensorStateTracker ──▶ StatePublisher
//!                             │                    └──▶ DoorStateChanged ─┐
//!                             └─ button press ──▶ Command(Button) ────────┴──▶ RequestSink
//! ```

use log::{debug, info, warn};

use crate::config::DebounceSettings;
use crate::drivers::debounce::{Debouncer, Transition};
use crate::events::RawEdge;

use super::commands::{Command, DoorRequest};
use super::events::SensorSnapshot;
use super::ports::{InputId, InputLevels, RequestSink, StatePublisher};
use super::tracker::SensorStateTracker;

// ───────────────────────────────────────────────────────────────
// InputService
// ───────────────────────────────────────────────────────────────

pub struct InputService<P: StatePublisher, Q: RequestSink> {
    debouncers: [Debouncer; 5],
    tracker: SensorStateTracker<P>,
    requests: Q,
    recheck_ms: u32,
    last_recheck_ms: u32,
}

impl<P: StatePublisher, Q: RequestSink> InputService<P, Q> {
    /// Register every input at its current level and publish the initial
    /// door state.
    pub fn new(
        debounce: &DebounceSettings,
        recheck_secs: u32,
        levels: &mut impl InputLevels,
        publisher: P,
        requests: Q,
        now_ms: u32,
    ) -> Self {
        let debouncers = InputId::ALL
            .map(|input| Debouncer::new(debounce.strategy, debounce.quiet_ms, levels.is_asserted(input)));
        let mut svc = Self {
            debouncers,
            tracker: SensorStateTracker::new(publisher),
            requests,
            recheck_ms: recheck_secs.saturating_mul(1000),
            last_recheck_ms: now_ms,
        };
        let snapshot = svc.sensor_snapshot();
        info!(
            "input: {:?} debounce {}ms, initial sensors open={} closed={}",
            debounce.strategy, debounce.quiet_ms, snapshot.open_asserted, snapshot.closed_asserted
        );
        svc.evaluate(snapshot);
        svc
    }

    // ── Edge / tick entry points ──────────────────────────────

    /// Feed one raw edge from the ISR queue.
    pub fn on_edge(&mut self, edge: RawEdge) {
        let idx = edge.input.index();
        if let Some(t) = self.debouncers[idx].confirm(edge.asserted, edge.at_ms) {
            self.route(edge.input, t);
        }
    }

    /// Run due debounce re-reads and, when its interval elapsed, the
    /// periodic sensor re-check.
    pub fn poll(&mut self, levels: &mut impl InputLevels, now_ms: u32) {
        for input in InputId::ALL {
            let d = &mut self.debouncers[input.index()];
            if !d.is_pending() {
                continue;
            }
            if let Some(t) = d.poll(levels.is_asserted(input), now_ms) {
                self.route(input, t);
            }
        }
        if now_ms.wrapping_sub(self.last_recheck_ms) >= self.recheck_ms {
            self.last_recheck_ms = now_ms;
            self.recheck(levels);
        }
    }

    /// Re-read both sensors outside of any edge.  Repairs edges lost to a
    /// full queue; publishes only if the derived state changed.
    pub fn recheck(&mut self, levels: &mut impl InputLevels) {
        for input in [InputId::SensorOpen, InputId::SensorClosed] {
            let level = levels.is_asserted(input);
            if let Some(t) = self.debouncers[input.index()].resync(level) {
                warn!("input: re-check found {:?} {:?} without an edge", input, t);
                self.route(input, t);
            }
        }
    }

    // ── Routing ───────────────────────────────────────────────

    fn route(&mut self, input: InputId, transition: Transition) {
        debug!("input: {:?} {:?}", input, transition);
        if let Some(sensor) = input.sensor() {
            if let Some(state) = self.tracker.on_sensor_edge(sensor, transition.is_asserted()) {
                self.requests.submit(DoorRequest::DoorStateChanged(state));
            }
            return;
        }
        if transition != Transition::Asserted {
            return;
        }
        let command = match input {
            InputId::ButtonOpen => Command::Open,
            InputId::ButtonClose => Command::Close,
            InputId::ButtonStop => Command::Stop,
            InputId::SensorOpen | InputId::SensorClosed => return,
        };
        info!("input: button {} pressed", command);
        self.requests.submit(DoorRequest::button(command));
    }

    fn evaluate(&mut self, snapshot: SensorSnapshot) {
        if let Some(state) = self.tracker.evaluate(snapshot) {
            self.requests.submit(DoorRequest::DoorStateChanged(state));
        }
    }

    fn sensor_snapshot(&self) -> SensorSnapshot {
        SensorSnapshot::new(
            self.debouncers[InputId::SensorOpen.index()].confirmed(),
            self.debouncers[InputId::SensorClosed.index()].confirmed(),
        )
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn tracker(&self) -> &SensorStateTracker<P> {
        &self.tracker
    }

    pub fn requests(&self) -> &Q {
        &self.requests
    }

    pub fn requests_mut(&mut self) -> &mut Q {
        &mut self.requests
    }
}
