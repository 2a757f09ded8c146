//! One-shot input initialisation and raw GPIO helpers.
//!
//! Configures the five monitored inputs (two end-stops, three buttons) as
//! pulled-up any-edge interrupt sources using raw ESP-IDF sys calls, and
//! registers one ISR per input.  Called once from `main()` before the input
//! task starts.  Motor outputs are owned by `esp-idf-hal` drivers instead;
//! the raw [`gpio_write`] here exists for the panic path only.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::sync::atomic::{AtomicI32, Ordering};

use crate::app::ports::{InputId, InputLevels};
use crate::config::PinAssignments;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── Input pin table ───────────────────────────────────────────

/// GPIO number per [`InputId`], readable from ISR context.
static INPUT_GPIOS: [AtomicI32; 5] = [const { AtomicI32::new(-1) }; 5];

fn input_gpio(input: InputId) -> i32 {
    INPUT_GPIOS[input.index()].load(Ordering::Relaxed)
}

/// GPIO number for each input in the configured assignment.
pub fn input_pin(pins: &PinAssignments, input: InputId) -> i32 {
    match input {
        InputId::SensorOpen => pins.sensor_open,
        InputId::SensorClosed => pins.sensor_closed,
        InputId::ButtonOpen => pins.button_open,
        InputId::ButtonClose => pins.button_close,
        InputId::ButtonStop => pins.button_stop,
    }
}

#[cfg(target_os = "espidf")]
use log::info;

/// Configure every input and install its edge ISR.
#[cfg(target_os = "espidf")]
pub fn init_inputs(pins: &PinAssignments) -> Result<(), HwInitError> {
    for input in InputId::ALL {
        INPUT_GPIOS[input.index()].store(input_pin(pins, input), Ordering::Relaxed);
    }
    // SAFETY: Called once from main() before the input task starts;
    // single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_isr_service()?;
    }
    info!("hw_init: inputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_inputs(pins: &PinAssignments) -> Result<(), HwInitError> {
    for input in InputId::ALL {
        INPUT_GPIOS[input.index()].store(input_pin(pins, input), Ordering::Relaxed);
    }
    log::info!("hw_init(sim): input init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let mask = InputId::ALL
        .iter()
        .fold(0u64, |m, &input| m | (1u64 << input_gpio(input)));
    // Reed switches and buttons pull to ground: active-low, internal pull-up.
    let cfg = gpio_config_t {
        pin_bit_mask: mask,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured pin; safe from any context including ISRs.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Host simulation: inputs idle HIGH (pull-up, not asserted).
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level is a single register write; the pin was
    // configured as an output by its owning driver.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// Stop an LEDC channel with its output idling LOW.  A plain GPIO write
/// cannot do this: the pin is routed to the LEDC signal, not to the GPIO
/// output register.
#[cfg(target_os = "espidf")]
pub fn pwm_stop_low(channel: u32) {
    // SAFETY: ledc_stop only touches the channel registers under the LEDC
    // spinlock; no allocation.
    unsafe {
        ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn pwm_stop_low(_channel: u32) {}

/// Milliseconds since boot, wrapping at `u32::MAX`.
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a counter read; safe from ISR context.
    (unsafe { esp_timer_get_time() } / 1_000) as u32
}

#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u32
}

// ── Level reader ──────────────────────────────────────────────

/// [`InputLevels`] over the raw GPIO registers (active-low).
pub struct GpioInputLevels;

impl InputLevels for GpioInputLevels {
    fn is_asserted(&mut self, input: InputId) -> bool {
        !gpio_read(input_gpio(input))
    }
}

// ── GPIO ISR Service ──────────────────────────────────────────

/// One handler for all inputs; `arg` carries the [`InputId`] index.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn input_gpio_isr(arg: *mut core::ffi::c_void) {
    let Some(input) = InputId::from_index(arg as usize) else {
        return;
    };
    // SAFETY: gpio_get_level and esp_timer_get_time are register reads;
    // push_raw_edge is lock-free.  Nothing here blocks or allocates.
    let asserted = unsafe { gpio_get_level(input_gpio(input)) } == 0;
    crate::events::push_raw_edge(crate::events::RawEdge {
        input,
        asserted,
        at_ms: uptime_ms(),
    });
}

#[cfg(target_os = "espidf")]
unsafe fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler only pushes
    // to the lock-free raw edge queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        for input in InputId::ALL {
            let pin = input_gpio(input);
            let ret = gpio_isr_handler_add(
                pin,
                Some(input_gpio_isr),
                input.index() as *mut core::ffi::c_void,
            );
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrAddFailed(ret));
            }
            gpio_intr_enable(pin);
        }
    }
    info!("hw_init: ISR service installed (end-stops ×2, buttons ×3)");
    Ok(())
}
