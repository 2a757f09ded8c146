//! Panic safety and runtime diagnostics.
//!
//! The panic hook forces both drive outputs LOW with raw GPIO writes and
//! stops the speed PWM channel with its output idling LOW, before the
//! default handler resets the chip, so the motor never keeps running
//! through a crash.  Pin and channel numbers are stored in atomics when the
//! hook is installed; the hook itself does not allocate.
//!
//! [`RuntimeMetrics`] is a periodic health line for the serial log.

use core::fmt;
use core::sync::atomic::{AtomicI32, Ordering};

use crate::config::PinAssignments;
use crate::drivers::hw_init;

static PANIC_LOW_PINS: [AtomicI32; 2] = [const { AtomicI32::new(-1) }; 2];
static PANIC_PWM_CHANNEL: AtomicI32 = AtomicI32::new(-1);

/// Install a panic hook that drops every motor output before unwinding.
///
/// Call once during init.  `pwm_channel` is the LEDC channel driving the
/// speed output.
pub fn install_panic_handler(pins: &PinAssignments, pwm_channel: u32) {
    for (slot, pin) in PANIC_LOW_PINS.iter().zip([pins.drive_open, pins.drive_close]) {
        slot.store(pin, Ordering::Relaxed);
    }
    PANIC_PWM_CHANNEL.store(pwm_channel as i32, Ordering::Relaxed);

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        force_outputs_low();
        log::error!("PANIC: {} (motor outputs forced low)", info);
        default_hook(info);
    }));
}

/// Raw LOW write on both drive outputs, then stop the speed PWM.  Safe
/// from panic context: register writes only.
pub fn force_outputs_low() {
    for slot in &PANIC_LOW_PINS {
        let pin = slot.load(Ordering::Relaxed);
        if pin >= 0 {
            hw_init::gpio_write(pin, false);
        }
    }
    let channel = PANIC_PWM_CHANNEL.load(Ordering::Relaxed);
    if channel >= 0 {
        hw_init::pwm_stop_low(channel as u32);
    }
}

/// Drive pins and PWM channel the panic hook will stop (`-1` = unset).
#[cfg(test)]
fn panic_targets() -> ([i32; 2], i32) {
    (
        [0, 1].map(|i| PANIC_LOW_PINS[i].load(Ordering::Relaxed)),
        PANIC_PWM_CHANNEL.load(Ordering::Relaxed),
    )
}

// ───────────────────────────────────────────────────────────────
// Runtime metrics
// ───────────────────────────────────────────────────────────────

/// Health snapshot collected on-demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeMetrics {
    pub uptime_secs: u32,
    pub requests_handled: u32,
    pub dropped_edges: u32,
    pub heap_free: u32,
    pub heap_min_free: u32,
}

impl RuntimeMetrics {
    pub fn collect(requests_handled: u32) -> Self {
        let (heap_free, heap_min_free) = heap_stats();
        Self {
            uptime_secs: hw_init::uptime_ms() / 1000,
            requests_handled,
            dropped_edges: crate::events::dropped_edges(),
            heap_free,
            heap_min_free,
        }
    }
}

#[cfg(target_os = "espidf")]
fn heap_stats() -> (u32, u32) {
    // SAFETY: heap statistics getters take no arguments and only read.
    unsafe {
        (
            esp_idf_svc::sys::esp_get_free_heap_size(),
            esp_idf_svc::sys::esp_get_minimum_free_heap_size(),
        )
    }
}

#[cfg(not(target_os = "espidf"))]
fn heap_stats() -> (u32, u32) {
    (0, 0)
}

impl fmt::Display for RuntimeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "up={}s requests={} dropped_edges={} heap={}B (min {}B)",
            self.uptime_secs,
            self.requests_handled,
            self.dropped_edges,
            self.heap_free,
            self.heap_min_free
        )
    }
}
