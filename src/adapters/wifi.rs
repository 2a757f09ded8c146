//! Wi-Fi station-mode adapter.
//!
//! Brings the station link up before the broker connection and keeps it up.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp-idf-svc`.
//! - **all other targets**: simulation stub that is always connected.
//!
//! ## Reconnection policy
//!
//! On link loss the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) between reconnect attempts.  The MQTT client
//! reconnects on its own once the link is back.

use core::fmt;

use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    DriverInit,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::DriverInit => write!(f, "WiFi driver init failed"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

impl From<ConnectivityError> for crate::error::CommsError {
    fn from(_: ConnectivityError) -> Self {
        Self::WifiConnectFailed
    }
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        let ssid = heapless::String::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        let password =
            heapless::String::try_from(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(Self { ssid, password })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Connected,
    Reconnecting { attempt: u32, next_at_secs: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

pub struct WifiLink {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    creds: WifiCredentials,
    state: WifiState,
    backoff_secs: u32,
}

impl WifiLink {
    /// Start the driver and block until the first connection is up.
    #[cfg(target_os = "espidf")]
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: WifiCredentials,
    ) -> Result<Self, ConnectivityError> {
        let driver = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
            error!("wifi: driver init failed: {:?}", e);
            ConnectivityError::DriverInit
        })?;
        let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(|e| {
            error!("wifi: event wrapper failed: {:?}", e);
            ConnectivityError::DriverInit
        })?;

        let client = ClientConfiguration {
            ssid: creds
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::DriverInit)?;
        wifi.start().map_err(|_| ConnectivityError::DriverInit)?;

        info!("wifi: connecting to '{}'", creds.ssid());
        wifi.connect().map_err(|e| {
            error!("wifi: connect failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })?;
        wifi.wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        info!("wifi: connected");

        Ok(Self {
            wifi,
            creds,
            state: WifiState::Connected,
            backoff_secs: INITIAL_BACKOFF_SECS,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn connect(creds: WifiCredentials) -> Result<Self, ConnectivityError> {
        info!("wifi(sim): connected to '{}'", creds.ssid());
        Ok(Self {
            creds,
            state: WifiState::Connected,
            backoff_secs: INITIAL_BACKOFF_SECS,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn ssid(&self) -> &str {
        self.creds.ssid()
    }

    /// Supervise the link.  Call periodically with seconds since boot.
    pub fn poll(&mut self, now_secs: u32) {
        match self.state {
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("wifi: link lost, reconnecting in {}s", self.backoff_secs);
                    self.state = WifiState::Reconnecting {
                        attempt: 0,
                        next_at_secs: now_secs.wrapping_add(self.backoff_secs),
                    };
                }
            }
            WifiState::Reconnecting {
                attempt,
                next_at_secs,
            } => {
                if now_secs.wrapping_sub(next_at_secs) > u32::MAX / 2 {
                    return;
                }
                info!("wifi: reconnect attempt {} (backoff {}s)", attempt, self.backoff_secs);
                if self.platform_reconnect() {
                    info!("wifi: reconnected");
                    self.state = WifiState::Connected;
                    self.backoff_secs = INITIAL_BACKOFF_SECS;
                } else {
                    self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    self.state = WifiState::Reconnecting {
                        attempt: attempt + 1,
                        next_at_secs: now_secs.wrapping_add(self.backoff_secs),
                    };
                }
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_reconnect(&mut self) -> bool {
        self.wifi.connect().is_ok() && self.wifi.wait_netif_up().is_ok()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reconnect(&mut self) -> bool {
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ssid() {
        assert_eq!(
            WifiCredentials::new("", "password123"),
            Err(ConnectivityError::NoCredentials)
        );
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(
            WifiCredentials::new("MyNet", "short"),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn rejects_overlong_ssid() {
        let ssid = "x".repeat(33);
        assert_eq!(
            WifiCredentials::new(&ssid, ""),
            Err(ConnectivityError::InvalidSsid)
        );
    }

    #[test]
    fn accepts_open_network() {
        let c = WifiCredentials::new("CoopNet", "").unwrap();
        assert!(c.is_open());
    }

    #[test]
    fn sim_link_stays_connected() {
        let creds = WifiCredentials::new("CoopNet", "mysecret8").unwrap();
        let mut link = WifiLink::connect(creds).unwrap();
        link.poll(10);
        assert_eq!(link.state(), WifiState::Connected);
        assert_eq!(link.ssid(), "CoopNet");
    }
}
