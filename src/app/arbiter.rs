//! Command arbiter: the single authority over the motor.
//!
//! Remote commands, button presses, tracker state changes and safety resets
//! all arrive on one bounded MPMC [`CommandQueue`].  The control loop is the
//! only consumer and owns the [`CommandArbiter`], which owns the
//! [`ActuatorController`].  Requests are therefore applied one at a time,
//! in acceptance order, and no two drive/stop protocols can interleave.
//!
//! ```text
//!   MQTT thread ──┐
//!                 ├──▶ CommandQueue ──▶ control loop ──▶ CommandArbiter ──▶ motor
//!   input task ───┘    (embassy Channel)
//! ```
//!
//! ## Rules
//!
//! - Button `Open` must fall strictly inside the configured window and
//!   requires a synced clock.  Rejections are logged, never signalled back.
//! - A drive towards an end-stop that is already asserted does not start
//!   the motor.
//! - While the tracker reports contradicting end-stops no drive starts:
//!   there is no trustworthy end-stop left to cut the motor.
//! - Reaching the end-stop the motor is driving towards stops it.
//! - `Stop` and `SafetyReset` always reset the outputs, even when idle.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, error, info, warn};

use crate::app::commands::{Command, DoorRequest, Origin};
use crate::app::events::DoorState;
use crate::app::ports::WallClock;
use crate::drivers::motor::{ActuatorController, Direction, MotorState};
use crate::error::ActuatorError;
use crate::window::{OpenWindow, TimeOfDay};

/// Depth of the command queue.  Producers block when it is full.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

pub type CommandQueue = Channel<CriticalSectionRawMutex, DoorRequest, COMMAND_QUEUE_DEPTH>;

/// Process-wide command queue.
pub static COMMAND_QUEUE: CommandQueue = Channel::new();

/// Enqueue a request from a blocking (non-async) producer thread.
pub fn submit(queue: &CommandQueue, request: DoorRequest) {
    if queue.try_send(request).is_err() {
        debug!("arbiter: queue full, waiting to enqueue {:?}", request);
        futures_lite::future::block_on(queue.send(request));
    }
}

/// Why a command was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Button `Open` outside the manual-open window.
    OutsideWindow(TimeOfDay),
    /// Button `Open` before the wall clock was synced.
    ClockNotSynced,
    /// Any drive while both end-stops read asserted.
    SensorFault,
}

/// What [`CommandArbiter::handle`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Motor started in this direction.
    Driving(Direction),
    /// Outputs reset.
    Stopped,
    /// Target end-stop already asserted; motor not started.
    AlreadyAtEndStop(DoorState),
    /// Dropped without touching the outputs.
    Rejected(RejectReason),
    /// The motor reached its target end-stop and was stopped.
    EndStopReached(DoorState),
    /// State recorded, no action needed.
    StateNoted(DoorState),
}

pub struct CommandArbiter<O, C, S, K>
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
    K: WallClock,
{
    actuator: ActuatorController<O, C, S>,
    clock: K,
    window: OpenWindow,
    /// Last state reported by the tracker.  `Unknown` until the first
    /// report.
    door: DoorState,
    /// The last report was a contradiction (both end-stops asserted).
    sensor_fault: bool,
}

impl<O, C, S, K> CommandArbiter<O, C, S, K>
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
    K: WallClock,
{
    pub fn new(actuator: ActuatorController<O, C, S>, clock: K, window: OpenWindow) -> Self {
        Self {
            actuator,
            clock,
            window,
            door: DoorState::Unknown,
            sensor_fault: false,
        }
    }

    /// Apply one request.  `Err` means a motor output could not be written;
    /// the caller must treat it as fatal.
    pub fn handle(&mut self, request: DoorRequest) -> Result<CommandOutcome, ActuatorError> {
        match request {
            DoorRequest::Command { command, origin } => self.on_command(command, origin),
            DoorRequest::DoorStateChanged(state) => self.on_door_state(state),
            DoorRequest::SafetyReset => {
                info!("arbiter: safety reset");
                self.actuator.stop()?;
                Ok(CommandOutcome::Stopped)
            }
        }
    }

    fn on_command(
        &mut self,
        command: Command,
        origin: Origin,
    ) -> Result<CommandOutcome, ActuatorError> {
        info!("arbiter: {} from {:?}", command, origin);
        let dir = match command {
            Command::Stop => {
                self.actuator.stop()?;
                return Ok(CommandOutcome::Stopped);
            }
            Command::Open => Direction::Open,
            Command::Close => Direction::Close,
        };

        if origin == Origin::Button && dir == Direction::Open {
            if let Err(reason) = self.check_window() {
                match reason {
                    RejectReason::OutsideWindow(now) => warn!(
                        "arbiter: button OPEN rejected at {} (allowed {})",
                        now, self.window
                    ),
                    RejectReason::ClockNotSynced => {
                        warn!("arbiter: button OPEN rejected, clock not synced")
                    }
                    RejectReason::SensorFault => {}
                }
                return Ok(CommandOutcome::Rejected(reason));
            }
        }

        if self.sensor_fault {
            warn!(
                "arbiter: {} from {:?} rejected, end-stop sensors contradict",
                command, origin
            );
            return Ok(CommandOutcome::Rejected(RejectReason::SensorFault));
        }

        if self.door == end_stop(dir) {
            info!("arbiter: door already {}, not driving", self.door);
            // A drive the other way may still be running off this end-stop.
            if self.actuator.is_driving() {
                self.actuator.stop()?;
            }
            return Ok(CommandOutcome::AlreadyAtEndStop(self.door));
        }

        self.actuator.drive(dir)?;
        Ok(CommandOutcome::Driving(dir))
    }

    fn on_door_state(&mut self, state: DoorState) -> Result<CommandOutcome, ActuatorError> {
        self.door = state;
        // The tracker only reports `Unknown` for a contradiction.
        self.sensor_fault = state == DoorState::Unknown;
        let motor = self.actuator.state();
        let reached = match motor.direction() {
            Some(dir) => state == end_stop(dir) || state == DoorState::Unknown,
            None => false,
        };
        if reached {
            if state == DoorState::Unknown {
                error!("arbiter: end-stop contradiction while {:?}, stopping", motor);
            } else {
                info!("arbiter: end-stop {} reached, stopping", state);
            }
            self.actuator.stop()?;
            return Ok(CommandOutcome::EndStopReached(state));
        }
        debug!("arbiter: door {} (motor {:?})", state, motor);
        Ok(CommandOutcome::StateNoted(state))
    }

    fn check_window(&self) -> Result<(), RejectReason> {
        let now = self.clock.time_of_day().ok_or(RejectReason::ClockNotSynced)?;
        if self.window.allows(now) {
            Ok(())
        } else {
            Err(RejectReason::OutsideWindow(now))
        }
    }

    pub fn motor_state(&self) -> MotorState {
        self.actuator.state()
    }

    /// Final reset before the process exits.
    pub fn shutdown(&mut self) -> Result<(), ActuatorError> {
        info!("arbiter: shutdown, resetting motor outputs");
        self.actuator.reset()
    }
}

/// The end-stop a drive direction moves towards.
const fn end_stop(dir: Direction) -> DoorState {
    match dir {
        Direction::Open => DoorState::Open,
        Direction::Close => DoorState::Closed,
    }
}

/// Consume the queue forever, calling `on_tick` after every request (with
/// its outcome) and at least every `tick` while idle (with `None`).  The
/// tick is where the watchdog gets fed.  Returns only on a fatal actuator
/// error.
pub async fn serve<O, C, S, K, F>(
    arbiter: &mut CommandArbiter<O, C, S, K>,
    queue: &CommandQueue,
    tick: Duration,
    mut on_tick: F,
) -> ActuatorError
where
    O: OutputPin,
    C: OutputPin,
    S: SetDutyCycle,
    K: WallClock,
    F: FnMut(Option<CommandOutcome>),
{
    loop {
        let next = futures_lite::future::or(async { Some(queue.receive().await) }, async {
            async_io_mini::Timer::after(tick).await;
            None
        })
        .await;
        let outcome = match next {
            Some(request) => match arbiter.handle(request) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("arbiter: {}", e);
                    return e;
                }
            },
            None => None,
        };
        on_tick(outcome);
    }
}
