//! CoopDoor firmware entry point.
//!
//! Hexagonal architecture: one control loop owns the motor, everything else
//! talks to it through the command queue.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiLink      ClockAdapter   NvsAdapter    MQTT Gateway       │
//! │  (station)     (WallClock)    (ConfigPort)  (rx + publisher)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  inputs task:  ISR edges ─▶ InputService ─▶ SensorStateTracker │
//! │                                   │                            │
//! │  mqtt-rx task: Gateway ───────────┼──▶ COMMAND_QUEUE           │
//! │                                   ▼          │                 │
//! │  main task:    CommandArbiter ◀──────────────┘                 │
//! │                     └─▶ ActuatorController (drive pins + PWM)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use coopdoor::adapters::log_sink::LogStatePublisher;
use coopdoor::adapters::mqtt::{self, Gateway, MqttStatePublisher};
use coopdoor::adapters::nvs::NvsAdapter;
use coopdoor::adapters::time::ClockAdapter;
use coopdoor::adapters::wifi::{WifiCredentials, WifiLink};
use coopdoor::app::arbiter::{self, CommandArbiter, COMMAND_QUEUE};
use coopdoor::app::ports::{ConfigError, ConfigPort};
use coopdoor::app::service::InputService;
use coopdoor::config::DoorConfig;
use coopdoor::diagnostics::{self, RuntimeMetrics};
use coopdoor::drivers::hw_init::{self, GpioInputLevels};
use coopdoor::drivers::motor::ActuatorController;
use coopdoor::drivers::task_pin::{spawn_on_core, Core};
use coopdoor::drivers::watchdog::{Watchdog, WATCHDOG_FEED_INTERVAL};
use coopdoor::events;
use coopdoor::pins::{MOTOR_PWM_CHANNEL, MOTOR_PWM_FREQ_HZ};

/// Input task period: debounce deadlines are checked this often.
const INPUT_TICK: Duration = Duration::from_millis(10);
/// Wi-Fi supervision / MQTT resubscribe period.
const NET_TICK: Duration = Duration::from_secs(1);
const METRICS_INTERVAL_SECS: u32 = 300;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CoopDoor v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config(&nvs_partition).context("configuration load failed")?;
    config.validate().context("configuration invalid")?;
    log::set_max_level(config.log_level.filter());
    info!(
        "Config: window {}, debounce {:?}/{}ms, duty {}%",
        config.open_window, config.debounce.strategy, config.debounce.quiet_ms, config.motor_duty_percent
    );

    // ── 3. Motor outputs (reset before anything can command them) ──
    diagnostics::install_panic_handler(&config.pins, MOTOR_PWM_CHANNEL);

    // SAFETY: pin numbers were range- and uniqueness-checked by
    // DoorConfig::validate, and each one is claimed by exactly one driver.
    let (drive_open, drive_close, speed_pin) = unsafe {
        (
            AnyOutputPin::new(config.pins.drive_open),
            AnyOutputPin::new(config.pins.drive_close),
            AnyOutputPin::new(config.pins.speed_pwm),
        )
    };
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(MOTOR_PWM_FREQ_HZ.Hz())
            .resolution(Resolution::Bits8),
    )
    .context("LEDC timer init failed")?;
    // Channel 0 is MOTOR_PWM_CHANNEL, which the panic hook stops.
    let speed = LedcDriver::new(peripherals.ledc.channel0, timer, speed_pin)
        .context("LEDC channel init failed")?;
    let actuator = ActuatorController::new(
        PinDriver::output(drive_open)?,
        PinDriver::output(drive_close)?,
        speed,
        config.motor_duty_percent,
    )?;

    // ── 4. Network ────────────────────────────────────────────
    let creds = WifiCredentials::new(&config.wifi.ssid, &config.wifi.password)?;
    let mut wifi = WifiLink::connect(peripherals.modem, sysloop, nvs_partition, creds)?;
    let clock = ClockAdapter::start(&config.timezone)?;

    let (client, connection) = mqtt::connect(&config.mqtt)?;
    let gateway = Gateway::new(&config.mqtt, config.reset_on_state_message);

    // ── 5. Inputs ─────────────────────────────────────────────
    hw_init::init_inputs(&config.pins)?;

    // ── 6. Tasks ──────────────────────────────────────────────
    let rx_gateway = gateway.clone();
    spawn_on_core(Core::Pro, 5, 6, "mqtt-rx\0", move || {
        mqtt::run_receiver(connection, rx_gateway, &COMMAND_QUEUE);
    })?;

    let publisher = (
        LogStatePublisher::new(),
        MqttStatePublisher::new(client.clone(), &config.mqtt),
    );
    let debounce = config.debounce;
    let recheck_secs = config.sensor_recheck_secs;
    spawn_on_core(Core::App, 10, 8, "inputs\0", move || {
        let mut levels = GpioInputLevels;
        let mut svc = InputService::new(
            &debounce,
            recheck_secs,
            &mut levels,
            publisher,
            &COMMAND_QUEUE,
            hw_init::uptime_ms(),
        );
        loop {
            events::drain_raw_edges(|edge| svc.on_edge(edge));
            svc.poll(&mut levels, hw_init::uptime_ms());
            std::thread::sleep(INPUT_TICK);
        }
    })?;

    spawn_on_core(Core::Pro, 4, 6, "net\0", move || loop {
        wifi.poll(hw_init::uptime_ms() / 1000);
        if let Err(e) = mqtt::service_subscriptions(&client, &gateway) {
            warn!("net: {}", e);
        }
        std::thread::sleep(NET_TICK);
    })?;

    // ── 7. Control loop ───────────────────────────────────────
    let mut arbiter = CommandArbiter::new(actuator, clock, config.open_window);
    let watchdog = Watchdog::subscribe_current();
    if !watchdog.is_subscribed() {
        warn!("Control loop runs without task watchdog");
    }
    let mut handled: u32 = 0;
    let mut last_metrics_secs: u32 = 0;

    info!("System ready. Entering control loop.");

    let fault = futures_lite::future::block_on(arbiter::serve(
        &mut arbiter,
        &COMMAND_QUEUE,
        WATCHDOG_FEED_INTERVAL,
        |outcome| {
            watchdog.feed();
            if outcome.is_some() {
                handled = handled.wrapping_add(1);
            }
            let now_secs = hw_init::uptime_ms() / 1000;
            if now_secs.wrapping_sub(last_metrics_secs) >= METRICS_INTERVAL_SECS {
                last_metrics_secs = now_secs;
                info!("metrics: {}", RuntimeMetrics::collect(handled));
            }
        },
    ));

    // Only reached on an actuator write failure.
    error!("Control loop stopped: {}", fault);
    if let Err(e) = arbiter.shutdown() {
        error!("Final reset failed: {}", e);
        diagnostics::force_outputs_low();
    }
    Err(fault.into())
}

/// Stored config, or the factory document when nothing usable is stored.
/// A stored config that decodes but fails validation is fatal.
fn load_config(partition: &EspDefaultNvsPartition) -> coopdoor::error::Result<DoorConfig> {
    let factory = DoorConfig::factory();
    let nvs = match NvsAdapter::new(partition.clone()) {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS open failed ({}), using factory config", e);
            return Ok(factory);
        }
    };
    match nvs.load(&factory) {
        Ok(cfg) => Ok(cfg),
        Err(ConfigError::Corrupted) => {
            warn!("Stored config corrupted, using factory config");
            Ok(factory)
        }
        Err(ConfigError::IoError) => {
            warn!("Stored config unreadable, using factory config");
            Ok(factory)
        }
        Err(e) => Err(e.into()),
    }
}
