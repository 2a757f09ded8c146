//! Property tests for the door-control invariants.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

#[path = "integration/mock_hw.rs"]
mod mock_hw;

use coopdoor::app::arbiter::{self, CommandArbiter, CommandQueue};
use coopdoor::app::commands::{Command, DoorRequest};
use coopdoor::app::events::{DoorState, Sensor, SensorSnapshot, StateChannel};
use coopdoor::app::tracker::SensorStateTracker;
use coopdoor::drivers::debounce::{DebounceStrategy, Debouncer, Transition};
use coopdoor::drivers::motor::{Direction, PinRole};
use coopdoor::window::{allow_open, OpenWindow, TimeOfDay};
use proptest::prelude::*;

use mock_hw::{drive_pins_overlap, recording_actuator, take, FixedClock, PinWrite, RecordingPublisher};

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![Just(Command::Open), Just(Command::Close), Just(Command::Stop)]
}

fn door_state() -> impl Strategy<Value = DoorState> {
    prop_oneof![
        Just(DoorState::Open),
        Just(DoorState::Closed),
        Just(DoorState::Running),
        Just(DoorState::Unknown),
    ]
}

fn request() -> impl Strategy<Value = DoorRequest> {
    prop_oneof![
        4 => command().prop_map(DoorRequest::remote),
        2 => command().prop_map(DoorRequest::button),
        2 => door_state().prop_map(DoorRequest::DoorStateChanged),
        1 => Just(DoorRequest::SafetyReset),
    ]
}

fn time_of_day() -> impl Strategy<Value = TimeOfDay> {
    (0u32..86_400).prop_map(|s| TimeOfDay::from_secs(s).unwrap())
}

// ── Mutual exclusion ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Several producer threads race requests into one queue; the single
    /// consumer never lets both drive pins be high together.
    #[test]
    fn concurrent_producers_never_overlap_drive_pins(
        batches in proptest::collection::vec(proptest::collection::vec(request(), 1..24), 2..5),
        now in proptest::option::of(time_of_day()),
    ) {
        let queue = CommandQueue::new();
        let total: usize = batches.iter().map(Vec::len).sum();
        let (actuator, trace) = recording_actuator(100);
        let window = OpenWindow {
            start: TimeOfDay::hms(7, 30, 0).unwrap(),
            end: TimeOfDay::hms(22, 0, 0).unwrap(),
        };
        let mut arb = CommandArbiter::new(actuator, FixedClock(now), window);

        std::thread::scope(|s| {
            for batch in &batches {
                let queue = &queue;
                s.spawn(move || {
                    for request in batch {
                        arbiter::submit(queue, *request);
                    }
                });
            }
            let mut handled = 0;
            while handled < total {
                match queue.try_receive() {
                    Ok(request) => {
                        arb.handle(request).unwrap();
                        handled += 1;
                    }
                    Err(_) => std::thread::yield_now(),
                }
            }
        });

        let writes = take(&trace);
        prop_assert!(!drive_pins_overlap(&writes));
    }
}

// ── Reset before drive ────────────────────────────────────────

proptest! {
    /// Every drive pin raised HIGH is immediately preceded by the full
    /// reset (both drive pins LOW, speed off) and the speed setting.
    #[test]
    fn every_drive_follows_a_reset(
        requests in proptest::collection::vec(request(), 1..64),
        duty in 1u8..=100,
    ) {
        let (actuator, trace) = recording_actuator(duty);
        let mut arb = CommandArbiter::new(actuator, FixedClock::at(12, 0), OpenWindow {
            start: TimeOfDay::hms(7, 30, 0).unwrap(),
            end: TimeOfDay::hms(22, 0, 0).unwrap(),
        });
        for request in requests {
            arb.handle(request).unwrap();
        }
        let writes = take(&trace);
        for (i, w) in writes.iter().enumerate() {
            if let PinWrite::Pin(role, true) = *w {
                prop_assert!(role != PinRole::SpeedEnable);
                prop_assert!(i >= 4);
                prop_assert_eq!(
                    &writes[i - 4..i],
                    &[
                        PinWrite::Pin(PinRole::DriveOpen, false),
                        PinWrite::Pin(PinRole::DriveClose, false),
                        PinWrite::Duty(0),
                        PinWrite::Duty(duty),
                    ]
                );
            }
        }
    }

    /// Drive/stop sequences straight on the controller keep the pins
    /// mutually exclusive and the recorded state in sync with the pins.
    #[test]
    fn controller_state_matches_pins(
        ops in proptest::collection::vec(prop_oneof![
            Just(Some(Direction::Open)),
            Just(Some(Direction::Close)),
            Just(None),
        ], 1..64),
    ) {
        let (mut ctl, trace) = recording_actuator(100);
        for op in ops {
            match op {
                Some(dir) => ctl.drive(dir).unwrap(),
                None => ctl.stop().unwrap(),
            }
            let writes = take(&trace);
            prop_assert!(!drive_pins_overlap(&writes));
            let last = writes.last().copied();
            match op {
                Some(Direction::Open) => {
                    prop_assert_eq!(last, Some(PinWrite::Pin(PinRole::DriveOpen, true)));
                }
                Some(Direction::Close) => {
                    prop_assert_eq!(last, Some(PinWrite::Pin(PinRole::DriveClose, true)));
                }
                None => {
                    prop_assert_eq!(last, Some(PinWrite::Duty(0)));
                    prop_assert!(!ctl.is_driving());
                }
            }
        }
    }
}

// ── Change-only publish ───────────────────────────────────────

proptest! {
    #[test]
    fn tracker_publishes_only_on_change(
        edges in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..64),
        initial in (any::<bool>(), any::<bool>()),
    ) {
        let mut tracker = SensorStateTracker::new(RecordingPublisher::default());
        tracker.evaluate(SensorSnapshot::new(initial.0, initial.1));

        let mut snapshot = SensorSnapshot::new(initial.0, initial.1);
        let mut derived = vec![snapshot.derive()];
        for (closed_sensor, asserted) in edges {
            let sensor = if closed_sensor { Sensor::Closed } else { Sensor::Open };
            snapshot = snapshot.with(sensor, asserted);
            derived.push(snapshot.derive());
            tracker.on_sensor_edge(sensor, asserted);
        }
        derived.dedup();

        let publisher = tracker.publisher();
        prop_assert_eq!(publisher.channel(StateChannel::Realtime), derived.clone());

        let latched = publisher.channel(StateChannel::Latched);
        prop_assert!(latched.iter().all(|s| s.is_end_position()));
        prop_assert!(latched.windows(2).all(|w| w[0] != w[1]));
        let mut expected: Vec<_> = derived.into_iter().filter(|s| s.is_end_position()).collect();
        expected.dedup();
        prop_assert_eq!(latched, expected);
    }
}

// ── Debounce convergence ──────────────────────────────────────

/// Feed a burst and poll well past the quiet interval; collect every
/// confirmed transition.
fn run_burst(
    strategy: DebounceStrategy,
    quiet: u32,
    initial: bool,
    burst: &[(u32, bool)],
    settled: bool,
) -> Vec<Transition> {
    let mut d = Debouncer::new(strategy, quiet, initial);
    let mut out = Vec::new();
    let start = 10_000u32;
    let mut last = start;
    for &(offset, level) in burst {
        last = start + offset;
        out.extend(d.confirm(level, last));
    }
    for t in (last..=last + 3 * quiet).step_by(5) {
        out.extend(d.poll(settled, t));
    }
    out
}

fn burst(quiet: u32) -> impl Strategy<Value = Vec<(u32, bool)>> {
    proptest::collection::vec((0..quiet, any::<bool>()), 1..16).prop_map(|mut v| {
        v.sort_by_key(|&(t, _)| t);
        v
    })
}

fn strategy() -> impl Strategy<Value = DebounceStrategy> {
    prop_oneof![Just(DebounceStrategy::Suppress), Just(DebounceStrategy::Confirm)]
}

proptest! {
    /// A bounce burst that starts towards and settles at the new level
    /// yields exactly one transition, for either strategy.
    #[test]
    fn bounce_burst_yields_one_transition(
        quiet in 20u32..200,
        initial in any::<bool>(),
        strategy in strategy(),
        seed in burst(200),
    ) {
        let target = !initial;
        let mut edges: Vec<(u32, bool)> = seed
            .into_iter()
            .filter(|&(t, _)| t < quiet)
            .collect();
        edges.insert(0, (0, target));
        edges.push((edges.last().map_or(0, |e| e.0), target));

        let transitions = run_burst(strategy, quiet, initial, &edges, target);
        prop_assert_eq!(transitions, vec![Transition::from_level(target)]);
    }

    /// A burst that settles back at the old level is a glitch and
    /// produces nothing, for either strategy.
    #[test]
    fn glitches_produce_no_transition(
        quiet in 20u32..200,
        initial in any::<bool>(),
        strategy in strategy(),
        edges in burst(200),
    ) {
        let transitions = run_burst(strategy, quiet, initial, &edges, initial);
        prop_assert!(transitions.is_empty());
    }
}

// ── Window gating ─────────────────────────────────────────────

proptest! {
    #[test]
    fn window_is_strict_on_both_ends(
        a in time_of_day(),
        b in time_of_day(),
        now in time_of_day(),
    ) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        prop_assert_eq!(allow_open(now, start, end), start < now && now < end);
        prop_assert!(!allow_open(start, start, end));
        prop_assert!(!allow_open(end, start, end));
        // Inverted windows allow nothing.
        prop_assert!(!allow_open(now, end, start) || start == end);
    }

    /// Button `Open` is gated by the window; remote `Open` never is.
    #[test]
    fn only_button_open_is_gated(now in time_of_day()) {
        let window = OpenWindow {
            start: TimeOfDay::hms(7, 30, 0).unwrap(),
            end: TimeOfDay::hms(22, 0, 0).unwrap(),
        };
        let (actuator, _trace) = recording_actuator(100);
        let mut arb = CommandArbiter::new(actuator, FixedClock(Some(now)), window);
        let button = arb.handle(DoorRequest::button(Command::Open)).unwrap();
        prop_assert_eq!(
            matches!(button, arbiter::CommandOutcome::Driving(Direction::Open)),
            window.allows(now)
        );
        arb.handle(DoorRequest::SafetyReset).unwrap();
        let remote = arb.handle(DoorRequest::remote(Command::Open)).unwrap();
        prop_assert_eq!(remote, arbiter::CommandOutcome::Driving(Direction::Open));
    }
}
