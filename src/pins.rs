//! Default GPIO / peripheral assignments for the coop-door controller board.
//!
//! These are the compiled-in defaults; the live assignment comes from
//! [`PinAssignments`](crate::config::PinAssignments) so a board revision can
//! remap pins without a rebuild.

// ---------------------------------------------------------------------------
// Motor driver (dual half-bridge, e.g. L298N / BTS7960)
// ---------------------------------------------------------------------------

/// Digital output: HIGH drives the motor in the opening direction.
pub const DRIVE_OPEN_GPIO: i32 = 4;
/// Digital output: HIGH drives the motor in the closing direction.
pub const DRIVE_CLOSE_GPIO: i32 = 5;
/// LEDC PWM output feeding the driver's enable / speed input.
pub const SPEED_PWM_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// End-stop reed switches (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// LOW = door fully open (magnet present).
pub const SENSOR_OPEN_GPIO: i32 = 10;
/// LOW = door fully closed (magnet present).
pub const SENSOR_CLOSED_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Push-buttons (active-low, internal pull-up)
// ---------------------------------------------------------------------------

pub const BUTTON_OPEN_GPIO: i32 = 15;
pub const BUTTON_CLOSE_GPIO: i32 = 16;
pub const BUTTON_STOP_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC channel (low-speed group) driving [`SPEED_PWM_GPIO`].  Must match
/// the channel peripheral claimed for the speed output at boot.
pub const MOTOR_PWM_CHANNEL: u32 = 0;

/// LEDC base frequency for the motor enable (25 kHz, inaudible; the
/// timer runs at 8-bit resolution).
pub const MOTOR_PWM_FREQ_HZ: u32 = 25_000;
