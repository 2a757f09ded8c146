//! Configuration load path: NVS blob → validated `DoorConfig`.

use coopdoor::adapters::nvs::NvsAdapter;
use coopdoor::app::ports::{ConfigError, ConfigPort};
use coopdoor::config::{DoorConfig, LogLevel};
use coopdoor::drivers::debounce::DebounceStrategy;

#[test]
fn first_boot_uses_factory_document() {
    let nvs = NvsAdapter::new().unwrap();
    let factory = DoorConfig::factory();
    assert_eq!(nvs.load(&factory).unwrap(), factory);
}

#[test]
fn stored_config_overrides_factory() {
    let nvs = NvsAdapter::new().unwrap();
    let mut cfg = DoorConfig::factory();
    cfg.debounce.strategy = DebounceStrategy::Suppress;
    cfg.debounce.quiet_ms = 30;
    cfg.mqtt.command_topic = "barn/door/set".into();
    cfg.log_level = LogLevel::Debug;
    nvs.save(&cfg).unwrap();

    let loaded = nvs.load(&DoorConfig::factory()).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.log_level.filter(), log::LevelFilter::Debug);
}

#[test]
fn truncated_blob_is_reported_corrupted() {
    let nvs = NvsAdapter::new().unwrap();
    let bytes = postcard::to_allocvec(&DoorConfig::factory()).unwrap();
    nvs.inject_raw(&bytes[..bytes.len() / 2]);
    assert_eq!(nvs.load(&DoorConfig::factory()), Err(ConfigError::Corrupted));
}

#[test]
fn stored_but_invalid_config_is_rejected() {
    let nvs = NvsAdapter::new().unwrap();
    let mut cfg = DoorConfig::factory();
    cfg.motor_duty_percent = 0;
    nvs.inject_raw(&postcard::to_allocvec(&cfg).unwrap());
    assert!(matches!(
        nvs.load(&DoorConfig::factory()),
        Err(ConfigError::ValidationFailed(_))
    ));
}
