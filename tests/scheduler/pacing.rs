//! Action pacing tests

use std::time::Duration;

use autarch_foundation::Result;
use autarch_scheduler::{ActionActor, ActionList, TaskOutcome, TaskState, Tick};
use proptest::prelude::*;

fn run_to_idle(
    actor: &mut ActionActor<u32>,
    interval: Duration,
    limit: u64,
) -> Vec<(u64, Duration, u32)> {
    let mut log = Vec::new();
    for number in 0..limit {
        let tick = Tick::every(number, interval);
        let mut sink = |action: &u32| -> Result<()> {
            log.push((tick.number, tick.now, *action));
            Ok(())
        };
        actor.tick(&tick, &mut sink);
        if actor.is_idle() {
            break;
        }
    }
    log
}

#[test]
fn one_action_per_tick_without_delay() {
    let mut actor = ActionActor::new(Duration::ZERO);
    let pending = actor.enqueue(ActionList::new([1, 2, 3]));

    let log = run_to_idle(&mut actor, Duration::from_millis(10), 10);
    let ticks: Vec<u64> = log.iter().map(|(n, _, _)| *n).collect();
    assert_eq!(ticks, vec![0, 1, 2]);

    match pending.outcome() {
        Some(TaskOutcome::Completed(summary)) => assert_eq!(summary.executed, 3),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn sequences_run_in_queue_order() {
    let mut actor = ActionActor::new(Duration::ZERO);
    let first = actor.enqueue(ActionList::new([1, 2]));
    let second = actor.enqueue(ActionList::new([3]));

    let log = run_to_idle(&mut actor, Duration::from_millis(10), 10);
    let actions: Vec<u32> = log.iter().map(|(_, _, a)| *a).collect();
    assert_eq!(actions, vec![1, 2, 3]);
    assert_eq!(first.state(), TaskState::Completed);
    assert_eq!(second.state(), TaskState::Completed);
}

#[test]
fn queued_sequence_can_be_cancelled_before_it_starts() {
    let mut actor = ActionActor::new(Duration::ZERO);
    let first = actor.enqueue(ActionList::new([1, 2]));
    let second = actor.enqueue(ActionList::new([3]));
    second.cancel();

    let log = run_to_idle(&mut actor, Duration::from_millis(10), 10);
    assert_eq!(log.len(), 2);
    assert_eq!(first.state(), TaskState::Completed);
    assert_eq!(second.state(), TaskState::Cancelled);
}

proptest! {
    #[test]
    fn actions_are_spaced_by_the_delay(
        count in 1usize..8,
        delay_ms in 0u64..400,
        interval_ms in 10u64..200,
    ) {
        let delay = Duration::from_millis(delay_ms);
        let mut actor = ActionActor::new(delay);
        let actions: Vec<u32> = (0..count as u32).collect();
        let pending = actor.enqueue(ActionList::new(actions.clone()));

        let log = run_to_idle(&mut actor, Duration::from_millis(interval_ms), 1_000);

        prop_assert_eq!(log.iter().map(|(_, _, a)| *a).collect::<Vec<_>>(), actions);
        let mut ticks: Vec<u64> = log.iter().map(|(n, _, _)| *n).collect();
        ticks.dedup();
        prop_assert_eq!(ticks.len(), count);
        for pair in log.windows(2) {
            prop_assert!(pair[1].1 - pair[0].1 >= delay);
        }
        prop_assert!(pending.is_finished());
    }
}
