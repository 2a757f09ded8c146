//! Port traits: the hexagonal boundary between door logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ tracker / arbiter (domain)
//! ```
//!
//! The domain never touches the broker, the wall clock or GPIO directly.
//! Motor outputs are the exception: the actuator controller is generic over
//! the `embedded-hal` output traits, which already are the port.

use crate::app::arbiter::{self, CommandQueue};
use crate::app::commands::DoorRequest;
use crate::app::events::{DoorState, Sensor, StateChannel};
use crate::config::DoorConfig;
use crate::window::TimeOfDay;

// ───────────────────────────────────────────────────────────────
// State publisher (driven adapter: domain → broker / log)
// ───────────────────────────────────────────────────────────────

/// Outbound state signal.  Fire-and-forget: the broker connection is
/// asynchronous and one-way, so delivery failures stay in the adapter.
pub trait StatePublisher {
    fn publish(&mut self, channel: StateChannel, state: DoorState);
}

impl<P: StatePublisher + ?Sized> StatePublisher for &mut P {
    fn publish(&mut self, channel: StateChannel, state: DoorState) {
        (**self).publish(channel, state);
    }
}

/// Fan-out to two publishers, in order.
impl<A: StatePublisher, B: StatePublisher> StatePublisher for (A, B) {
    fn publish(&mut self, channel: StateChannel, state: DoorState) {
        self.0.publish(channel, state);
        self.1.publish(channel, state);
    }
}

// ───────────────────────────────────────────────────────────────
// Request sink (domain → command queue)
// ───────────────────────────────────────────────────────────────

/// Where the input side hands requests to the arbiter.
pub trait RequestSink {
    fn submit(&mut self, request: DoorRequest);
}

impl RequestSink for &CommandQueue {
    fn submit(&mut self, request: DoorRequest) {
        arbiter::submit(*self, request);
    }
}

impl RequestSink for Vec<DoorRequest> {
    fn submit(&mut self, request: DoorRequest) {
        self.push(request);
    }
}

// ───────────────────────────────────────────────────────────────
// Wall clock (driven adapter: SNTP-synced RTC → domain)
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time for the manual-open window.
pub trait WallClock {
    /// Local time of day, or `None` while the clock is not yet synced.
    fn time_of_day(&self) -> Option<TimeOfDay>;
}

// ───────────────────────────────────────────────────────────────
// Input levels (driven adapter: GPIO → domain)
// ───────────────────────────────────────────────────────────────

/// Every monitored digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputId {
    SensorOpen = 0,
    SensorClosed = 1,
    ButtonOpen = 2,
    ButtonClose = 3,
    ButtonStop = 4,
}

impl InputId {
    pub const ALL: [Self; 5] = [
        Self::SensorOpen,
        Self::SensorClosed,
        Self::ButtonOpen,
        Self::ButtonClose,
        Self::ButtonStop,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Self::SensorOpen),
            1 => Some(Self::SensorClosed),
            2 => Some(Self::ButtonOpen),
            3 => Some(Self::ButtonClose),
            4 => Some(Self::ButtonStop),
            _ => None,
        }
    }

    /// The end-stop this input belongs to, if it is a sensor.
    pub const fn sensor(self) -> Option<Sensor> {
        match self {
            Self::SensorOpen => Some(Sensor::Open),
            Self::SensorClosed => Some(Sensor::Closed),
            _ => None,
        }
    }
}

/// Reads the current logical level of an input (`true` = asserted /
/// pressed).  Adapters own the active-low conversion.
pub trait InputLevels {
    fn is_asserted(&mut self, input: InputId) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the door configuration.
///
/// Implementations MUST validate before persisting.
pub trait ConfigPort {
    /// Load configuration, falling back to `fallback` when nothing is stored.
    fn load(&self, fallback: &DoorConfig) -> Result<DoorConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DoorConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Factory JSON document could not be parsed.
    Parse,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Parse => write!(f, "config document malformed"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
