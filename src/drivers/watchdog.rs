//! Task Watchdog Timer (TWDT) guard for the control loop.
//!
//! The control loop subscribes itself and feeds the TWDT after every
//! request and on every idle tick.  A wedged loop (for example a blocked
//! actuator write) panics the chip, and the panic hook drops the drive pins.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::time::Duration;

use log::{info, warn};

/// TWDT timeout.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);
/// Idle feed interval; well inside [`WATCHDOG_TIMEOUT`].
pub const WATCHDOG_FEED_INTERVAL: Duration = Duration::from_secs(2);

pub struct Watchdog {
    subscribed: bool,
}

impl Watchdog {
    /// Reconfigure the TWDT and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn subscribe_current() -> Self {
        // SAFETY: TWDT API calls from the task being subscribed.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT.as_millis() as u32,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK as i32 {
                warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
            }
            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK as i32;
            if subscribed {
                info!(
                    "watchdog: control loop subscribed ({}s timeout)",
                    WATCHDOG_TIMEOUT.as_secs()
                );
            } else {
                warn!("watchdog: failed to subscribe ({})", ret);
            }
            Self { subscribed }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribe_current() -> Self {
        info!("watchdog(sim): no-op");
        Self { subscribed: false }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the subscribed calling task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_interval_is_inside_timeout() {
        assert!(WATCHDOG_FEED_INTERVAL * 3 <= WATCHDOG_TIMEOUT);
    }

    #[test]
    fn sim_watchdog_is_inert() {
        let wd = Watchdog::subscribe_current();
        assert!(!wd.is_subscribed());
        wd.feed();
    }
}
