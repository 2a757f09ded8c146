//! Fuzz target: stored configuration blob
//!
//! Feeds arbitrary bytes to the NVS config loader (simulation backend) and
//! asserts it never panics and never hands out an invalid config.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use coopdoor::adapters::nvs::NvsAdapter;
use coopdoor::app::ports::ConfigPort;
use coopdoor::config::DoorConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    nvs.inject_raw(data);
    if let Ok(cfg) = nvs.load(&DoorConfig::default()) {
        assert!(cfg.validate().is_ok(), "loader returned an invalid config");
    }
});
