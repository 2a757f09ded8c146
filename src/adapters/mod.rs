//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                   |
//! |------------|------------------|-------------------------------|
//! | `log_sink` | StatePublisher   | Serial log output             |
//! | `mqtt`     | StatePublisher   | MQTT broker (state topics)    |
//! |            | RequestSink user | MQTT broker (command topic)   |
//! | `nvs`      | ConfigPort       | NVS / in-memory store         |
//! | `time`     | WallClock        | SNTP-synced RTC               |
//! | `wifi`     |                  | ESP-IDF WiFi STA              |

pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
