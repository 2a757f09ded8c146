//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the door configuration is stored as one
//! postcard blob (`coopdoor` / `doorcfg`).  A missing blob means "use the
//! fallback"; a blob that fails to decode is reported as corrupted so the
//! caller can decide whether to boot on factory settings.
//!
//! - Validation: every config is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - The simulation backend is an in-memory map (dev/test only).

use core::cell::RefCell;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::DoorConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

pub const CONFIG_NAMESPACE: &str = "coopdoor";
pub const CONFIG_KEY: &str = "doorcfg";

const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    nvs: RefCell<EspNvs<NvsDefault>>,
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Open the config namespace on the default partition.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
        let nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true).map_err(|e| {
            log::error!("NvsAdapter: open '{}' failed: {:?}", CONFIG_NAMESPACE, e);
            ConfigError::IoError
        })?;
        info!("NvsAdapter: ESP-IDF NVS namespace '{}' open", CONFIG_NAMESPACE);
        Ok(Self {
            nvs: RefCell::new(nvs),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, ConfigError> {
        info!("NvsAdapter: simulation backend");
        Ok(Self {
            store: RefCell::new(HashMap::new()),
        })
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        let nvs = self.nvs.borrow();
        match nvs.get_blob(CONFIG_KEY, &mut buf) {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("NvsAdapter: read failed: {:?}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.store.borrow().get(&composite_key()).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.nvs
            .borrow_mut()
            .set_blob(CONFIG_KEY, bytes)
            .map_err(|e| {
                warn!("NvsAdapter: write failed: {:?}", e);
                ConfigError::IoError
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.store.borrow_mut().insert(composite_key(), bytes.to_vec());
        Ok(())
    }

    /// Overwrite the stored blob with raw bytes (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_raw(&self, bytes: &[u8]) {
        self.store.borrow_mut().insert(composite_key(), bytes.to_vec());
    }
}

#[cfg(not(target_os = "espidf"))]
fn composite_key() -> String {
    format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
}

impl ConfigPort for NvsAdapter {
    fn load(&self, fallback: &DoorConfig) -> Result<DoorConfig, ConfigError> {
        let Some(bytes) = self.read_blob()? else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(fallback.clone());
        };
        let cfg: DoorConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded config from store ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &DoorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::ValidationFailed("config blob too large"));
        }
        self.write_blob(&bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
