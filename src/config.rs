//! Door controller configuration.
//!
//! All tunable parameters live in [`DoorConfig`].  Factory defaults ship as
//! `config/coopdoor.json` (embedded at build time); a validated copy can be
//! persisted to NVS as a postcard blob and overrides the factory document.
//! Configuration is static for the lifetime of the process.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::drivers::debounce::DebounceStrategy;
use crate::pins;
use crate::window::{OpenWindow, TimeOfDay};

/// Factory configuration document.
pub const FACTORY_CONFIG_JSON: &str = include_str!("../config/coopdoor.json");

/// GPIO assignments.  Every number must be distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAssignments {
    pub drive_open: i32,
    pub drive_close: i32,
    pub speed_pwm: i32,
    pub button_open: i32,
    pub button_close: i32,
    pub button_stop: i32,
    pub sensor_open: i32,
    pub sensor_closed: i32,
}

impl PinAssignments {
    pub fn as_array(&self) -> [i32; 8] {
        [
            self.drive_open,
            self.drive_close,
            self.speed_pwm,
            self.button_open,
            self.button_close,
            self.button_stop,
            self.sensor_open,
            self.sensor_closed,
        ]
    }
}

impl Default for PinAssignments {
    fn default() -> Self {
        Self {
            drive_open: pins::DRIVE_OPEN_GPIO,
            drive_close: pins::DRIVE_CLOSE_GPIO,
            speed_pwm: pins::SPEED_PWM_GPIO,
            button_open: pins::BUTTON_OPEN_GPIO,
            button_close: pins::BUTTON_CLOSE_GPIO,
            button_stop: pins::BUTTON_STOP_GPIO,
            sensor_open: pins::SENSOR_OPEN_GPIO,
            sensor_closed: pins::SENSOR_CLOSED_GPIO,
        }
    }
}

/// Broker connection and topic names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttSettings {
    /// e.g. `mqtt://192.168.1.10:1883`
    pub broker_url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// Inbound `OPEN` / `CLOSE` / `STOP`.
    pub command_topic: String,
    /// Outbound, retained, `OPEN` / `CLOSED` only.
    pub state_topic: String,
    /// Outbound, every derived state.
    pub realtime_topic: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://192.168.1.10:1883".into(),
            client_id: "coopdoor".into(),
            username: String::new(),
            password: String::new(),
            command_topic: "coop/door/command".into(),
            state_topic: "coop/door/state".into(),
            realtime_topic: "coop/door/state/realtime".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiSettings {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceSettings {
    pub strategy: DebounceStrategy,
    pub quiet_ms: u32,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            strategy: DebounceStrategy::Confirm,
            quiet_ms: 100,
        }
    }
}

/// Log verbosity, applied with `log::set_max_level` at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorConfig {
    pub pins: PinAssignments,
    pub mqtt: MqttSettings,
    pub wifi: WifiSettings,
    pub debounce: DebounceSettings,

    /// Daily window in which the Open button is honoured (local time).
    pub open_window: OpenWindow,
    /// Speed output duty while driving (1-100%).
    pub motor_duty_percent: u8,
    /// Interval between unconditional sensor re-reads.
    pub sensor_recheck_secs: u32,
    /// Reset the drive pins on any message seen on the state topic.
    pub reset_on_state_message: bool,

    /// POSIX TZ string, e.g. `CET-1CEST,M3.5.0,M10.5.0/3`.
    pub timezone: String,
    pub log_level: LogLevel,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            pins: PinAssignments::default(),
            mqtt: MqttSettings::default(),
            wifi: WifiSettings::default(),
            debounce: DebounceSettings::default(),
            open_window: OpenWindow {
                start: TimeOfDay::hms(7, 30, 0).unwrap_or(TimeOfDay::MIDNIGHT),
                end: TimeOfDay::hms(22, 0, 0).unwrap_or(TimeOfDay::MIDNIGHT),
            },
            motor_duty_percent: 100,
            sensor_recheck_secs: 10,
            reset_on_state_message: false,
            timezone: "UTC0".into(),
            log_level: LogLevel::Info,
        }
    }
}

impl DoorConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(doc).map_err(|e| {
            log::error!("config: JSON parse failed: {}", e);
            ConfigError::Parse
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Embedded factory defaults, or the compiled-in [`Default`] if the
    /// document is unusable.
    pub fn factory() -> Self {
        match Self::from_json(FACTORY_CONFIG_JSON) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config: factory document rejected ({}), using built-ins", e);
                Self::default()
            }
        }
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = self.pins.as_array();
        for (i, a) in pins.iter().enumerate() {
            if !(0..=48).contains(a) {
                return Err(ConfigError::ValidationFailed("GPIO numbers must be 0–48"));
            }
            if pins[i + 1..].contains(a) {
                return Err(ConfigError::ValidationFailed("GPIO assignments must be distinct"));
            }
        }
        if self.open_window.start >= self.open_window.end {
            return Err(ConfigError::ValidationFailed(
                "open_window.start must be before open_window.end",
            ));
        }
        if !(5..=1000).contains(&self.debounce.quiet_ms) {
            return Err(ConfigError::ValidationFailed(
                "debounce.quiet_ms must be 5–1000",
            ));
        }
        if !(1..=100).contains(&self.motor_duty_percent) {
            return Err(ConfigError::ValidationFailed(
                "motor_duty_percent must be 1–100",
            ));
        }
        if !(1..=3600).contains(&self.sensor_recheck_secs) {
            return Err(ConfigError::ValidationFailed(
                "sensor_recheck_secs must be 1–3600",
            ));
        }
        if self.mqtt.broker_url.is_empty() || self.mqtt.client_id.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "mqtt broker_url and client_id are required",
            ));
        }
        let topics = [
            &self.mqtt.command_topic,
            &self.mqtt.state_topic,
            &self.mqtt.realtime_topic,
        ];
        if topics.iter().any(|t| t.is_empty()) {
            return Err(ConfigError::ValidationFailed("mqtt topics must be non-empty"));
        }
        if topics.iter().any(|t| t.contains(['+', '#'])) {
            return Err(ConfigError::ValidationFailed(
                "mqtt topics must not contain wildcards",
            ));
        }
        if self.mqtt.command_topic == self.mqtt.state_topic
            || self.mqtt.command_topic == self.mqtt.realtime_topic
        {
            return Err(ConfigError::ValidationFailed(
                "command topic must differ from the state topics",
            ));
        }
        if self.timezone.is_empty() {
            return Err(ConfigError::ValidationFailed("timezone is required"));
        }
        Ok(())
    }
}
