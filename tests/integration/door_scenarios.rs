//! End-to-end door scenarios against mock pins, clock and publisher.

use coopdoor::app::arbiter::{CommandArbiter, CommandOutcome, RejectReason};
use coopdoor::app::commands::{Command, DoorRequest};
use coopdoor::app::events::{DoorState, Sensor, SensorSnapshot, StateChannel};
use coopdoor::app::ports::InputId;
use coopdoor::app::service::InputService;
use coopdoor::app::tracker::SensorStateTracker;
use coopdoor::config::DebounceSettings;
use coopdoor::drivers::debounce::DebounceStrategy;
use coopdoor::drivers::motor::{Direction, MotorState, PinRole};
use coopdoor::events::RawEdge;
use coopdoor::window::{OpenWindow, TimeOfDay};

use crate::log_capture;
use crate::mock_hw::{
    recording_actuator, take, FixedClock, MockLevels, PinWrite, RecordingPin, RecordingPublisher,
    RecordingPwm, Trace, RESET,
};

type MockArbiter = CommandArbiter<RecordingPin, RecordingPin, RecordingPwm, FixedClock>;

fn window() -> OpenWindow {
    OpenWindow {
        start: TimeOfDay::hms(7, 30, 0).unwrap(),
        end: TimeOfDay::hms(22, 0, 0).unwrap(),
    }
}

fn arbiter(clock: FixedClock) -> (MockArbiter, Trace) {
    let (actuator, trace) = recording_actuator(100);
    (CommandArbiter::new(actuator, clock, window()), trace)
}

#[test]
fn remote_open_then_stop_pin_trace() {
    // Remote commands bypass the window, even with no clock.
    let (mut arb, trace) = arbiter(FixedClock(None));

    let out = arb.handle(DoorRequest::remote(Command::Open)).unwrap();
    assert_eq!(out, CommandOutcome::Driving(Direction::Open));
    let mut expected = RESET.to_vec();
    expected.extend([PinWrite::Duty(100), PinWrite::Pin(PinRole::DriveOpen, true)]);
    assert_eq!(take(&trace), expected);

    let out = arb.handle(DoorRequest::remote(Command::Stop)).unwrap();
    assert_eq!(out, CommandOutcome::Stopped);
    assert_eq!(take(&trace), RESET.to_vec());
    assert_eq!(arb.motor_state(), MotorState::Idle);
}

#[test]
fn early_button_open_leaves_pins_untouched() {
    let (mut arb, trace) = arbiter(FixedClock::at(6, 0));
    log_capture::start();
    let out = arb.handle(DoorRequest::button(Command::Open)).unwrap();
    assert_eq!(
        out,
        CommandOutcome::Rejected(RejectReason::OutsideWindow(TimeOfDay::hms(6, 0, 0).unwrap()))
    );
    assert!(take(&trace).is_empty());
    assert_eq!(arb.motor_state(), MotorState::Idle);

    let warnings: Vec<_> = log_capture::take()
        .into_iter()
        .filter(|r| r.level == log::Level::Warn)
        .collect();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(
        warnings[0].message.contains("button OPEN rejected at 06:00:00"),
        "{}",
        warnings[0].message
    );
}

#[test]
fn contradictory_sensors_publish_unknown_once() {
    let mut tracker = SensorStateTracker::new(RecordingPublisher::default());
    assert_eq!(
        tracker.evaluate(SensorSnapshot::new(true, true)),
        Some(DoorState::Unknown)
    );
    assert_eq!(tracker.evaluate(SensorSnapshot::new(true, true)), None);
    assert_eq!(
        tracker.publisher().published,
        vec![(StateChannel::Realtime, DoorState::Unknown)]
    );
}

#[test]
fn closing_travel_publishes_running_then_closed() {
    let mut tracker = SensorStateTracker::new(RecordingPublisher::default());
    tracker.evaluate(SensorSnapshot::new(true, false));
    tracker.publisher_mut().published.clear();

    tracker.on_sensor_edge(Sensor::Open, false);
    tracker.on_sensor_edge(Sensor::Closed, true);

    let p = tracker.publisher();
    assert_eq!(
        p.channel(StateChannel::Realtime),
        vec![DoorState::Running, DoorState::Closed]
    );
    assert_eq!(p.channel(StateChannel::Latched), vec![DoorState::Closed]);
}

/// Inputs → queue → arbiter, with the end-stop cutting the motor.
#[test]
fn button_close_runs_until_closed_end_stop() {
    let settings = DebounceSettings {
        strategy: DebounceStrategy::Confirm,
        quiet_ms: 50,
    };
    let mut levels = MockLevels::default();
    levels.set(InputId::SensorOpen, true);
    let mut svc = InputService::new(
        &settings,
        10,
        &mut levels,
        RecordingPublisher::default(),
        Vec::new(),
        0,
    );
    let (mut arb, trace) = arbiter(FixedClock::at(20, 0));
    let mut pump = |svc: &mut InputService<RecordingPublisher, Vec<DoorRequest>>| {
        svc.requests_mut()
            .drain(..)
            .map(|r| arb.handle(r).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(pump(&mut svc), vec![CommandOutcome::StateNoted(DoorState::Open)]);

    // Press close.
    levels.set(InputId::ButtonClose, true);
    svc.on_edge(RawEdge {
        input: InputId::ButtonClose,
        asserted: true,
        at_ms: 1_000,
    });
    svc.poll(&mut levels, 1_060);
    assert_eq!(pump(&mut svc), vec![CommandOutcome::Driving(Direction::Close)]);

    // Door leaves the open end-stop, then reaches the closed one.
    levels.set(InputId::SensorOpen, false);
    svc.on_edge(RawEdge {
        input: InputId::SensorOpen,
        asserted: false,
        at_ms: 2_000,
    });
    svc.poll(&mut levels, 2_060);
    levels.set(InputId::SensorClosed, true);
    svc.on_edge(RawEdge {
        input: InputId::SensorClosed,
        asserted: true,
        at_ms: 5_000,
    });
    svc.poll(&mut levels, 5_060);
    assert_eq!(
        pump(&mut svc),
        vec![
            CommandOutcome::StateNoted(DoorState::Running),
            CommandOutcome::EndStopReached(DoorState::Closed),
        ]
    );

    let writes = take(&trace);
    assert_eq!(&writes[writes.len() - 3..], &RESET);
    assert_eq!(arb.motor_state(), MotorState::Idle);
    assert_eq!(
        svc.tracker().publisher().channel(StateChannel::Latched),
        vec![DoorState::Open, DoorState::Closed]
    );
}
