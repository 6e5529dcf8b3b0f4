//! Rule executions against the simulated kitchen.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

use autarch_engine::GoalStatus;
use autarch_foundation::EntityId;
use autarch_runtime::{Action, ExecutionOutcome, Orchestrator, SnapshotProvider, parse_rule_set};
use autarch_scheduler::ActionSink;

use crate::world::{RULES, World, config, provider, run_until, sink, tick};

fn kitchen(
    world: &Rc<RefCell<World>>,
) -> Orchestrator<impl SnapshotProvider + use<>, impl ActionSink<Action> + use<>> {
    Orchestrator::new(
        config(),
        parse_rule_set(RULES).unwrap(),
        provider(world),
        sink(world),
    )
}

#[test]
fn cooks_until_the_goal_completes() {
    let world = Rc::new(RefCell::new(World::with_grubs(3)));
    let mut orchestrator = kitchen(&world);

    let last = run_until(&mut orchestrator, 30, |o| {
        o.goal_status("feed") == Some(GoalStatus::Complete) && !o.is_running("cook")
    });
    assert_eq!(last, 8);

    let world = world.borrow();
    assert_eq!(world.meals, 2);
    assert_eq!(
        world.log,
        vec![
            "slot Entity(1) into kitchen/main",
            "start kitchen",
            "collect output of kitchen",
            "slot Entity(2) into kitchen/main",
            "start kitchen",
            "collect output of kitchen",
        ]
    );
    assert!(world.table.contains_key(&EntityId(3)));
    assert_eq!(world.table.values().filter(|e| e.element.as_str() == "stew").count(), 2);
}

#[test]
fn completed_goal_stops_new_work() {
    let world = Rc::new(RefCell::new(World::with_grubs(5)));
    let mut orchestrator = kitchen(&world);
    let last = run_until(&mut orchestrator, 30, |o| {
        o.goal_status("feed") == Some(GoalStatus::Complete)
    });

    for number in last + 1..last + 6 {
        let report = orchestrator.tick(tick(number)).unwrap();
        assert!(report.started.is_empty());
    }
    assert_eq!(world.borrow().meals, 2);
    assert_eq!(world.borrow().table.len(), 5);
}

#[test]
fn refused_start_closes_the_station_and_fails() {
    let world = Rc::new(RefCell::new(World::with_grubs(1)));
    world.borrow_mut().refuse_start = true;
    let mut orchestrator = kitchen(&world);

    let mut finished = Vec::new();
    for number in 0..10 {
        finished = orchestrator.tick(tick(number)).unwrap().finished;
        if !finished.is_empty() {
            break;
        }
    }

    assert_eq!(
        finished,
        vec![(
            "cook".to_string(),
            ExecutionOutcome::Failed("aborted after a failed action".to_string())
        )]
    );
    let world = world.borrow();
    assert_eq!(
        &world.log[..3],
        ["slot Entity(1) into kitchen/main", "start kitchen", "close kitchen"]
    );
}

#[test]
fn vanished_station_fails_the_execution() {
    let world = Rc::new(RefCell::new(World::with_grubs(1)));
    let mut orchestrator = kitchen(&world);
    orchestrator.tick(tick(0)).unwrap();
    orchestrator.tick(tick(1)).unwrap();

    world.borrow_mut().kitchen_present = false;
    let report = orchestrator.tick(tick(2)).unwrap();

    assert_eq!(
        report.finished,
        vec![(
            "cook".to_string(),
            ExecutionOutcome::Failed("station kitchen disappeared".to_string())
        )]
    );
    assert_eq!(orchestrator.held().held_entity_count(), 0);
}

#[test]
fn background_cancellation_stops_before_the_next_action() {
    let world = Rc::new(RefCell::new(World::with_grubs(1)));
    let mut orchestrator = kitchen(&world);
    orchestrator.tick(tick(0)).unwrap();
    assert!(orchestrator.is_running("cook"));

    let sender = orchestrator.continuations();
    thread::spawn(move || {
        sender
            .send(|o| {
                o.cancel_rule("cook");
            })
            .unwrap();
    })
    .join()
    .unwrap();

    let report = orchestrator.tick(tick(1)).unwrap();
    assert_eq!(report.continuations, 1);
    assert_eq!(report.finished, vec![("cook".to_string(), ExecutionOutcome::Cancelled)]);
    assert!(report.started.is_empty());
    assert_eq!(world.borrow().log, vec!["slot Entity(1) into kitchen/main"]);
}
