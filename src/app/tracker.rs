//! Sensor state tracker.
//!
//! Owns the logical reading of both end-stops and the last published door
//! state.  Every confirmed sensor transition recomputes the snapshot and
//! derives a [`DoorState`]; a publish happens only when the derived state
//! differs from the previous one.
//!
//! | Channel    | Publishes                                 | Retained |
//! |------------|-------------------------------------------|----------|
//! | `Realtime` | every change, all four states             | no       |
//! | `Latched`  | `OPEN` / `CLOSED` when it differs from the | yes      |
//! |            | last latched value                        |          |
//!
//! The tracker never fails: a contradictory reading maps to `Unknown`,
//! which is published like any other state.

use log::{info, warn};

use crate::app::events::{DoorState, Sensor, SensorSnapshot, StateChannel};
use crate::app::ports::StatePublisher;

pub struct SensorStateTracker<P: StatePublisher> {
    publisher: P,
    snapshot: SensorSnapshot,
    /// `None` until the first evaluation.
    last_published: Option<DoorState>,
    last_latched: Option<DoorState>,
}

impl<P: StatePublisher> SensorStateTracker<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            snapshot: SensorSnapshot::default(),
            last_published: None,
            last_latched: None,
        }
    }

    /// A debounced transition on one end-stop.  Returns the new door state
    /// when it was published.
    pub fn on_sensor_edge(&mut self, sensor: Sensor, asserted: bool) -> Option<DoorState> {
        let snapshot = self.snapshot.with(sensor, asserted);
        self.evaluate(snapshot)
    }

    /// Replace the whole snapshot (startup read, periodic re-check).
    /// Publishes only on change, like an edge.
    pub fn evaluate(&mut self, snapshot: SensorSnapshot) -> Option<DoorState> {
        self.snapshot = snapshot;
        let state = snapshot.derive();
        if self.last_published == Some(state) {
            return None;
        }
        self.last_published = Some(state);

        if state == DoorState::Unknown {
            warn!(
                "tracker: both end-stops asserted (open={}, closed={}), reporting UNKNOWN",
                snapshot.open_asserted, snapshot.closed_asserted
            );
        } else {
            info!("tracker: door is {}", state);
        }
        self.publisher.publish(StateChannel::Realtime, state);

        if state.is_end_position() && self.last_latched != Some(state) {
            self.last_latched = Some(state);
            self.publisher.publish(StateChannel::Latched, state);
        }
        Some(state)
    }

    /// Current derived state; `Unknown` before the first evaluation.
    pub fn state(&self) -> DoorState {
        self.last_published.unwrap_or(DoorState::Unknown)
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }
}
