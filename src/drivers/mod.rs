//! Motor driver, input debouncing, hardware initialisation and task helpers.

pub mod debounce;
pub mod hw_init;
pub mod motor;
pub mod task_pin;
pub mod watchdog;
