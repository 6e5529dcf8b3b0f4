//! Heartbeat task tests

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use autarch_foundation::ErrorKind;
use autarch_scheduler::{Delay, Heartbeat, TaskOutcome, TaskState, Tick, Timeout, WaitUntil};

fn at(number: u64) -> Tick {
    Tick::every(number, Duration::from_millis(100))
}

#[test]
fn wait_until_completes_on_first_true_tick() {
    let flag = Rc::new(Cell::new(false));
    let watched = Rc::clone(&flag);
    let mut heartbeat = Heartbeat::new();
    let (id, handle) = heartbeat.spawn(WaitUntil::new(move |_: &Tick| watched.get()));

    assert_eq!(heartbeat.tick(&at(0)), 0);
    assert_eq!(handle.state(), TaskState::Active);

    flag.set(true);
    assert_eq!(heartbeat.tick(&at(1)), 1);
    assert_eq!(handle.state(), TaskState::Completed);
    assert!(!heartbeat.contains(id));
    assert!(heartbeat.is_empty());
}

#[test]
fn delay_measures_from_first_tick() {
    let mut heartbeat = Heartbeat::new();
    let (_, handle) = heartbeat.spawn(Delay::new(Duration::from_millis(250)));

    for number in 2..5 {
        heartbeat.tick(&at(number));
    }
    assert!(!handle.is_finished());

    heartbeat.tick(&at(5));
    match handle.outcome() {
        Some(TaskOutcome::Completed(now)) => assert_eq!(now, Duration::from_millis(500)),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn timeout_loses_to_fast_work_and_wins_against_slow_work() {
    let mut heartbeat = Heartbeat::new();
    let (_, fast) = heartbeat.spawn(Timeout::new(
        Delay::new(Duration::from_millis(100)),
        Duration::from_millis(300),
    ));
    let (_, slow) = heartbeat.spawn(Timeout::new(
        WaitUntil::new(|_: &Tick| false),
        Duration::from_millis(300),
    ));

    for number in 0..=3 {
        heartbeat.tick(&at(number));
    }

    assert_eq!(fast.state(), TaskState::Completed);
    match slow.outcome() {
        Some(TaskOutcome::Faulted(error)) => {
            assert!(matches!(error.kind, ErrorKind::Timeout { after_ms: 300 }));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(heartbeat.is_empty());
}

#[test]
fn cancelled_task_resolves_on_next_tick() {
    let mut heartbeat = Heartbeat::new();
    let (id, handle) = heartbeat.spawn(WaitUntil::new(|_: &Tick| false));
    let (other, _) = heartbeat.spawn(WaitUntil::new(|_: &Tick| false));

    assert!(heartbeat.cancel(id));
    assert_eq!(handle.state(), TaskState::Active);

    heartbeat.tick(&at(0));
    assert_eq!(handle.state(), TaskState::Cancelled);
    assert!(!heartbeat.contains(id));
    assert!(heartbeat.contains(other));
    assert!(!heartbeat.cancel(id));
}
