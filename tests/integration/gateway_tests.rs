//! MQTT gateway → command queue → arbiter.

use coopdoor::adapters::mqtt::{Gateway, GatewayEvent};
use coopdoor::app::arbiter::{CommandArbiter, CommandOutcome, CommandQueue};
use coopdoor::app::events::DoorState;
use coopdoor::app::commands::DoorRequest;
use coopdoor::config::MqttSettings;
use coopdoor::drivers::motor::{Direction, MotorState};
use coopdoor::window::{OpenWindow, TimeOfDay};

use crate::mock_hw::{recording_actuator, take, FixedClock, RESET};

fn received<'a>(topic: &'a str, payload: &'a [u8]) -> GatewayEvent<'a> {
    GatewayEvent::Received {
        topic: Some(topic),
        payload,
    }
}

#[test]
fn remote_commands_reach_the_motor_in_order() {
    let gateway = Gateway::new(&MqttSettings::default(), false);
    let queue = CommandQueue::new();
    let mut sink = &queue;

    gateway.handle(received("coop/door/command", b"CLOSE"), &mut sink);
    gateway.handle(received("coop/door/command", b"bogus"), &mut sink);
    gateway.handle(received("coop/door/command", b"STOP"), &mut sink);

    let (actuator, trace) = recording_actuator(80);
    let window = OpenWindow {
        start: TimeOfDay::hms(7, 30, 0).unwrap(),
        end: TimeOfDay::hms(22, 0, 0).unwrap(),
    };
    let mut arb = CommandArbiter::new(actuator, FixedClock(None), window);
    let mut outcomes = Vec::new();
    while let Ok(request) = queue.try_receive() {
        outcomes.push(arb.handle(request).unwrap());
    }
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Driving(Direction::Close), CommandOutcome::Stopped]
    );
    assert_eq!(arb.motor_state(), MotorState::Idle);
    let writes = take(&trace);
    assert_eq!(&writes[writes.len() - 3..], &RESET);
}

#[test]
fn lost_connection_stops_a_running_motor() {
    let gateway = Gateway::new(&MqttSettings::default(), false);
    let mut requests: Vec<DoorRequest> = Vec::new();
    gateway.handle(received("coop/door/command", b"OPEN"), &mut requests);
    gateway.handle(GatewayEvent::Disconnected, &mut requests);

    let (actuator, _trace) = recording_actuator(100);
    let window = OpenWindow {
        start: TimeOfDay::hms(7, 30, 0).unwrap(),
        end: TimeOfDay::hms(22, 0, 0).unwrap(),
    };
    let mut arb = CommandArbiter::new(actuator, FixedClock(None), window);
    arb.handle(DoorRequest::DoorStateChanged(DoorState::Closed)).unwrap();
    let outcomes: Vec<_> = requests.into_iter().map(|r| arb.handle(r).unwrap()).collect();
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Driving(Direction::Open), CommandOutcome::Stopped]
    );
    assert_eq!(arb.motor_state(), MotorState::Idle);
}

#[test]
fn legacy_state_echo_resets_outputs() {
    let gateway = Gateway::new(&MqttSettings::default(), true);
    let mut requests: Vec<DoorRequest> = Vec::new();
    gateway.handle(received("coop/door/state", b"CLOSED"), &mut requests);
    assert_eq!(requests, vec![DoorRequest::SafetyReset]);
}
