//! Door state vocabulary shared by the tracker, the arbiter and the
//! messaging gateway.
//!
//! The wire tokens defined here are the exact payloads exchanged with the
//! broker.  They are case-sensitive.

use core::fmt;

/// Canonical state of the door as derived from the two end-stop sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorState {
    /// Open end-stop asserted.
    Open,
    /// Closed end-stop asserted.
    Closed,
    /// Neither end-stop asserted: mid-travel.
    Running,
    /// No reading taken yet, or both end-stops asserted (input fault).
    Unknown,
}

impl DoorState {
    /// Payload published on the state topics.
    pub const fn as_token(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Running => "RUNNING",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether this state is a resting end position (eligible for the
    /// latched topic).
    pub const fn is_end_position(self) -> bool {
        matches!(self, Self::Open | Self::Closed)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// The two end-stop sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensor {
    /// Asserted when the door is fully open.
    Open,
    /// Asserted when the door is fully closed.
    Closed,
}

/// Logical (already debounced) reading of both end-stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub open_asserted: bool,
    pub closed_asserted: bool,
}

impl SensorSnapshot {
    pub const fn new(open_asserted: bool, closed_asserted: bool) -> Self {
        Self {
            open_asserted,
            closed_asserted,
        }
    }

    /// Copy of this snapshot with one sensor updated.
    #[must_use]
    pub const fn with(self, sensor: Sensor, asserted: bool) -> Self {
        match sensor {
            Sensor::Open => Self::new(asserted, self.closed_asserted),
            Sensor::Closed => Self::new(self.open_asserted, asserted),
        }
    }

    /// Total mapping from sensor readings to a door state.
    pub const fn derive(self) -> DoorState {
        match (self.open_asserted, self.closed_asserted) {
            (false, false) => DoorState::Running,
            (true, false) => DoorState::Open,
            (false, true) => DoorState::Closed,
            (true, true) => DoorState::Unknown,
        }
    }
}

/// The two outbound state signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChannel {
    /// Every derived state change, including `RUNNING` and `UNKNOWN`.
    Realtime,
    /// Retained; only `OPEN` / `CLOSED`.
    Latched,
}

impl StateChannel {
    /// Latched publishes must be retained by the broker.
    pub const fn retained(self) -> bool {
        matches!(self, Self::Latched)
    }
}
