//! Mock hardware for integration tests.
//!
//! Records every motor output write into one shared trace so tests can
//! assert on the exact pin sequence without touching GPIO/LEDC registers.
//! Shared with `property_tests.rs`, which uses only part of it.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use coopdoor::app::events::{DoorState, StateChannel};
use coopdoor::app::ports::{InputId, InputLevels, StatePublisher, WallClock};
use coopdoor::drivers::motor::{ActuatorController, PinRole};
use coopdoor::window::TimeOfDay;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

// ── Pin write record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Pin(PinRole, bool),
    /// Speed duty in percent.
    Duty(u8),
}

pub type Trace = Arc<Mutex<Vec<PinWrite>>>;

/// The reset protocol as seen on the pins.
pub const RESET: [PinWrite; 3] = [
    PinWrite::Pin(PinRole::DriveOpen, false),
    PinWrite::Pin(PinRole::DriveClose, false),
    PinWrite::Duty(0),
];

pub struct RecordingPin {
    role: PinRole,
    trace: Trace,
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        push(&self.trace, PinWrite::Pin(self.role, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        push(&self.trace, PinWrite::Pin(self.role, true));
        Ok(())
    }
}

pub struct RecordingPwm {
    trace: Trace,
}

impl embedded_hal::pwm::ErrorType for RecordingPwm {
    type Error = Infallible;
}

impl SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        100
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        push(&self.trace, PinWrite::Duty(duty as u8));
        Ok(())
    }
}

fn push(trace: &Trace, write: PinWrite) {
    trace.lock().unwrap().push(write);
}

pub type MockActuator = ActuatorController<RecordingPin, RecordingPin, RecordingPwm>;

/// Controller over recording pins.  The construction-time reset is
/// cleared from the trace.
pub fn recording_actuator(duty_percent: u8) -> (MockActuator, Trace) {
    let trace: Trace = Arc::default();
    let ctl = ActuatorController::new(
        RecordingPin {
            role: PinRole::DriveOpen,
            trace: trace.clone(),
        },
        RecordingPin {
            role: PinRole::DriveClose,
            trace: trace.clone(),
        },
        RecordingPwm {
            trace: trace.clone(),
        },
        duty_percent,
    )
    .unwrap();
    take(&trace);
    (ctl, trace)
}

/// Drain the trace.
pub fn take(trace: &Trace) -> Vec<PinWrite> {
    std::mem::take(&mut *trace.lock().unwrap())
}

/// Replay a trace and report whether both drive pins were ever HIGH at
/// the same time.
pub fn drive_pins_overlap(writes: &[PinWrite]) -> bool {
    let (mut open, mut close) = (false, false);
    for w in writes {
        match *w {
            PinWrite::Pin(PinRole::DriveOpen, v) => open = v,
            PinWrite::Pin(PinRole::DriveClose, v) => close = v,
            _ => {}
        }
        if open && close {
            return true;
        }
    }
    false
}

// ── Publisher / clock / levels ────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub published: Vec<(StateChannel, DoorState)>,
}

impl RecordingPublisher {
    pub fn channel(&self, channel: StateChannel) -> Vec<DoorState> {
        self.published
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, s)| *s)
            .collect()
    }
}

impl StatePublisher for RecordingPublisher {
    fn publish(&mut self, channel: StateChannel, state: DoorState) {
        self.published.push((channel, state));
    }
}

/// Wall clock frozen at one instant (`None` = not synced).
pub struct FixedClock(pub Option<TimeOfDay>);

impl FixedClock {
    pub fn at(h: u8, m: u8) -> Self {
        Self(TimeOfDay::hms(h, m, 0))
    }
}

impl WallClock for FixedClock {
    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.0
    }
}

/// Logical input levels, settable per input.
#[derive(Debug, Default)]
pub struct MockLevels([bool; 5]);

impl MockLevels {
    pub fn set(&mut self, input: InputId, asserted: bool) {
        self.0[input.index()] = asserted;
    }
}

impl InputLevels for MockLevels {
    fn is_asserted(&mut self, input: InputId) -> bool {
        self.0[input.index()]
    }
}
