//! Manual-open time window.
//!
//! A push-button `Open` is only honoured strictly inside a daily window
//! (for example 07:30–22:00 local time).  Remote commands are never gated.
//! This is a plain predicate: no state, no scheduling.
//!
//! ```text
//!   00:00 ────────── start ██████████████████ end ────────── 24:00
//!                         ^ rejected           ^ rejected
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: u32 = 24 * 3600;

/// Wall-clock time within a calendar day, second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    secs: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self { secs: 0 };

    /// Build from hours, minutes and seconds.  `None` when out of range.
    pub const fn hms(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self {
            secs: hour as u32 * 3600 + minute as u32 * 60 + second as u32,
        })
    }

    /// Build from seconds since midnight.  `None` past 23:59:59.
    pub const fn from_secs(secs: u32) -> Option<Self> {
        if secs >= SECS_PER_DAY {
            return None;
        }
        Some(Self { secs })
    }

    pub const fn hour(self) -> u8 {
        (self.secs / 3600) as u8
    }

    pub const fn minute(self) -> u8 {
        ((self.secs / 60) % 60) as u8
    }

    pub const fn second(self) -> u8 {
        (self.secs % 60) as u8
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour(), self.minute(), self.second())
    }
}

/// Error returned when a `HH:MM[:SS]` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError;

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected HH:MM or HH:MM:SS")
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let mut field = || -> Result<Option<u8>, ParseTimeError> {
            match parts.next() {
                None => Ok(None),
                Some(p) if p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit()) => {
                    p.parse().map(Some).map_err(|_| ParseTimeError)
                }
                Some(_) => Err(ParseTimeError),
            }
        };
        let hour = field()?.ok_or(ParseTimeError)?;
        let minute = field()?.ok_or(ParseTimeError)?;
        let second = field()?.unwrap_or(0);
        if field()?.is_some() {
            return Err(ParseTimeError);
        }
        Self::hms(hour, minute, second).ok_or(ParseTimeError)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Whether a manual open is allowed at `now`.
///
/// True iff `window_start < now < window_end`.  Both boundaries are
/// excluded.  A window whose start is not before its end allows nothing.
pub fn allow_open(now: TimeOfDay, window_start: TimeOfDay, window_end: TimeOfDay) -> bool {
    window_start < now && now < window_end
}

/// Configured daily window, as stored in [`DoorConfig`](crate::config::DoorConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl OpenWindow {
    pub fn allows(&self, now: TimeOfDay) -> bool {
        allow_open(now, self.start, self.end)
    }
}

impl fmt::Display for OpenWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}
