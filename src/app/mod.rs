//! Application core: door-control logic with no direct I/O.
//!
//! Sensor tracking, command arbitration and input routing.  Hardware is
//! reached through the **port traits** in [`ports`] and the `embedded-hal`
//! output traits, so this layer is fully testable without real peripherals.

pub mod arbiter;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod tracker;
