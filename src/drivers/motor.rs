//! Door motor actuator (dual half-bridge with PWM enable).
//!
//! Two direction outputs and one speed output.  The controller is the only
//! code allowed to write these pins.
//!
//! ## Drive protocol
//!
//! ```text
//!   drive(dir):  reset()  ──▶  speed = max  ──▶  drive pin(dir) = HIGH
//!   stop():      reset()
//!   reset():     open = LOW, close = LOW, speed = 0   (unconditional)
//! ```
//!
//! Every transition into a driving state is preceded by a full reset, so
//! both direction outputs are never HIGH together, even transiently.
//!
//! ## Dual-target design
//!
//! Generic over the `embedded-hal` 1.0 output traits: on ESP-IDF the pins are
//! `PinDriver`s and the speed output an `LedcDriver`; on host the tests use
//! recording mocks.

use core::fmt;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::error::ActuatorError;

/// Physical roles owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinRole {
    DriveOpen,
    DriveClose,
    SpeedEnable,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DriveOpen => "drive-open",
            Self::DriveClose => "drive-close",
            Self::SpeedEnable => "speed-enable",
        })
    }
}

/// Travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    const fn pin_role(self) -> PinRole {
        match self {
            Self::Open => PinRole::DriveOpen,
            Self::Close => PinRole::DriveClose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Idle,
    DrivingOpen,
    DrivingClose,
}

impl MotorState {
    pub const fn driving(dir: Direction) -> Self {
        match dir {
            Direction::Open => Self::DrivingOpen,
            Direction::Close => Self::DrivingClose,
        }
    }

    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Idle => None,
            Self::DrivingOpen => Some(Direction::Open),
            Self::DrivingClose => Some(Direction::Close),
        }
    }
}

pub struct ActuatorController<O, C, S>
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
{
    open: O,
    close: C,
    speed: S,
    /// Duty applied while driving (1-100%).
    max_duty_percent: u8,
    state: MotorState,
}

impl<O, C, S> ActuatorController<O, C, S>
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
{
    /// Take ownership of the three outputs and force them to the idle
    /// levels.  Fails without returning a half-initialised controller.
    pub fn new(open: O, close: C, speed: S, max_duty_percent: u8) -> Result<Self, ActuatorError> {
        let mut ctl = Self {
            open,
            close,
            speed,
            max_duty_percent: max_duty_percent.clamp(1, 100),
            state: MotorState::Idle,
        };
        ctl.reset()?;
        info!("motor: controller ready (duty {}%)", ctl.max_duty_percent);
        Ok(ctl)
    }

    /// Reset then drive towards `dir`.
    pub fn drive(&mut self, dir: Direction) -> Result<(), ActuatorError> {
        self.reset()?;
        self.speed
            .set_duty_cycle_percent(self.max_duty_percent)
            .map_err(|_| ActuatorError::pwm(PinRole::SpeedEnable))?;
        let raised = match dir {
            Direction::Open => self.open.set_high().is_ok(),
            Direction::Close => self.close.set_high().is_ok(),
        };
        if !raised {
            return Err(ActuatorError::gpio(dir.pin_role()));
        }
        self.state = MotorState::driving(dir);
        info!("motor: driving {:?} at {}%", dir, self.max_duty_percent);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        let was = self.state;
        self.reset()?;
        if was != MotorState::Idle {
            info!("motor: stopped (was {:?})", was);
        }
        Ok(())
    }

    /// Both direction outputs LOW, speed 0%.  Safe to call in any state.
    pub fn reset(&mut self) -> Result<(), ActuatorError> {
        debug!("motor: resetting outputs");
        // Mark idle first: if a write below fails the outputs are unknown,
        // and the caller must treat the error as fatal anyway.
        self.state = MotorState::Idle;
        self.open
            .set_low()
            .map_err(|_| ActuatorError::gpio(PinRole::DriveOpen))?;
        self.close
            .set_low()
            .map_err(|_| ActuatorError::gpio(PinRole::DriveClose))?;
        self.speed
            .set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::pwm(PinRole::SpeedEnable))?;
        Ok(())
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn is_driving(&self) -> bool {
        self.state != MotorState::Idle
    }
}

impl<O, C, S> Drop for ActuatorController<O, C, S>
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
{
    fn drop(&mut self) {
        if self.reset().is_err() {
            warn!("motor: final reset failed on drop");
        }
    }
}
