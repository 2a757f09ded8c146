//! Core-pinned thread spawning for the coop-door tasks.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` sets the affinity, priority and stack size of
//! the *next* `pthread_create()` from the calling thread, so configure and
//! spawn must not interleave with other thread creation.
//!
//! | Task       | Core | Priority | Why                                   |
//! |------------|------|----------|---------------------------------------|
//! | `mqtt-rx`  | Pro  | 5        | next to lwIP / Wi-Fi                  |
//! | `inputs`   | App  | 10       | debounce deadlines are time-sensitive |
//! | main loop  | App  | default  | arbiter + motor                       |

use std::io;
use std::thread::JoinHandle;

/// CPU cores of the ESP32 dual-core parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks.
    Pro = 0,
    /// Core 1 (APP_CPU): door logic.
    App = 1,
}

/// Spawn a named thread pinned to `core`.  `name` must be NUL-terminated
/// (e.g. `"inputs\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<F>(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: the config struct is fully initialised by the default
    // constructor; `name` is 'static and NUL-terminated.
    let ret = unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr() as *const _;
        esp_idf_svc::sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "task: spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );
    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Simulation fallback: no core affinity or priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<F>(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let display_name = name.trim_end_matches('\0');
    log::info!("task(sim): spawning '{}' (stack={}KB)", display_name, stack_kb);
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
