//! Decision archives written during a run.

use std::cell::RefCell;
use std::rc::Rc;

use autarch_engine::GoalStatus;
use autarch_runtime::{DecisionOutcome, MemorySink, Orchestrator, parse_rule_set, read_archive};
use tempfile::tempdir;

use crate::world::{RULES, World, config, provider, run_until, sink};

#[test]
fn archived_decisions_read_back_in_order() {
    let dir = tempdir().unwrap();
    let world = Rc::new(RefCell::new(World::with_grubs(3)));
    let mut orchestrator = Orchestrator::from_config(
        config().with_diagnostics_dir(dir.path().join("decisions")),
        parse_rule_set(RULES).unwrap(),
        provider(&world),
        sink(&world),
    )
    .unwrap();

    run_until(&mut orchestrator, 30, |o| {
        o.goal_status("feed") == Some(GoalStatus::Complete) && !o.is_running("cook")
    });

    let records = read_archive(dir.path().join("decisions")).unwrap();
    let summary: Vec<(u64, DecisionOutcome)> =
        records.iter().map(|r| (r.tick, r.outcome.clone())).collect();
    assert_eq!(
        summary,
        vec![
            (0, DecisionOutcome::Started),
            (4, DecisionOutcome::Completed),
            (4, DecisionOutcome::Started),
            (8, DecisionOutcome::Completed),
        ]
    );
    assert!(records.iter().all(|r| r.rule == "cook" && r.goal == "feed"));
    assert!(records.windows(2).all(|w| w[0].snapshot <= w[1].snapshot));
}

#[test]
fn starved_rule_explains_itself_every_tick() {
    let world = Rc::new(RefCell::new(World::with_grubs(0)));
    let records = MemorySink::new();
    let mut orchestrator = Orchestrator::new(
        config(),
        parse_rule_set(RULES).unwrap(),
        provider(&world),
        sink(&world),
    )
    .with_diagnostics(records.clone());

    for number in 0..3 {
        orchestrator.tick(crate::world::tick(number)).unwrap();
    }

    let decisions = records.take();
    assert_eq!(decisions.len(), 3);
    for decision in &decisions {
        assert_eq!(decision.outcome, DecisionOutcome::Blocked);
        let trace = decision.trace.as_deref().unwrap_or_default();
        assert!(trace.contains("nothing available for slot main"), "{trace}");
    }
    assert!(world.borrow().log.is_empty());
}
