//! Wall-clock adapter.
//!
//! Implements [`WallClock`] for the manual-open window.
//!
//! - **`target_os = "espidf"`**: SNTP keeps the RTC synced; local time comes
//!   from `gettimeofday()` + `localtime_r()` under the configured POSIX
//!   `TZ`.  Until the first sync the clock reports `None`.
//! - **`not(target_os = "espidf")`**: UTC time of day from `SystemTime`.

use log::info;

use crate::app::ports::WallClock;
use crate::window::TimeOfDay;

/// Anything before 2020-01-01 means the RTC was never synced.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const EPOCH_2020: i64 = 1_577_836_800;

pub struct ClockAdapter {
    #[cfg(target_os = "espidf")]
    _sntp: esp_idf_svc::sntp::EspSntp<'static>,
}

impl ClockAdapter {
    /// Apply the POSIX timezone and start SNTP.
    #[cfg(target_os = "espidf")]
    pub fn start(timezone: &str) -> Result<Self, crate::error::CommsError> {
        apply_timezone(timezone);
        let sntp = esp_idf_svc::sntp::EspSntp::new_default().map_err(|e| {
            log::error!("clock: SNTP start failed: {:?}", e);
            crate::error::CommsError::SntpFailed
        })?;
        info!("clock: SNTP started, TZ={}", timezone);
        Ok(Self { _sntp: sntp })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start(timezone: &str) -> Result<Self, crate::error::CommsError> {
        info!("clock(sim): using host UTC, ignoring TZ={}", timezone);
        Ok(Self {})
    }
}

#[cfg(target_os = "espidf")]
fn apply_timezone(tz: &str) {
    let Ok(value) = std::ffi::CString::new(tz) else {
        log::warn!("clock: timezone contains NUL, keeping UTC");
        return;
    };
    // SAFETY: called once at boot before any other task reads the
    // environment; both strings are NUL-terminated.
    unsafe {
        esp_idf_svc::sys::setenv(c"TZ".as_ptr(), value.as_ptr(), 1);
        esp_idf_svc::sys::tzset();
    }
}

impl WallClock for ClockAdapter {
    #[cfg(target_os = "espidf")]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: gettimeofday writes into the provided struct only.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        // SAFETY: localtime_r is the reentrant variant; `tm` is a plain C
        // struct for which all-zero is a valid value.
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        // tm_sec can be 60 on a leap second; clamp into the day.
        TimeOfDay::hms(
            u8::try_from(tm.tm_hour).ok()?,
            u8::try_from(tm.tm_min).ok()?,
            u8::try_from(tm.tm_sec.min(59)).ok()?,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn time_of_day(&self) -> Option<TimeOfDay> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        TimeOfDay::from_secs((now.as_secs() % 86_400) as u32)
    }
}
