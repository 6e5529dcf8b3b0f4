//! Condition evaluation tests

use autarch_engine::{
    Condition, ConditionEngine, EntitySetCondition, EvalContext, GameStateCondition,
    HeldResources, MemoryCondition, SelectorSpec, StationCondition, TraceMode,
};
use autarch_foundation::{Entity, EntityId, GameStateSnapshot, SnapshotClock, Station, StationState};
use proptest::prelude::*;

fn grub(id: u64) -> Entity {
    Entity::new(EntityId(id), "tiny_grub").with_aspect("nourishment", 1)
}

fn two_grubs() -> Condition {
    let selector = SelectorSpec::element("tiny_grub").into_selector();
    EntitySetCondition::new(vec![selector.clone(), selector]).into()
}

// =============================================================================
// Consuming Matches
// =============================================================================

#[test]
fn one_grub_cannot_satisfy_two_requirements() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0).entity(grub(1)).build(&mut clock);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held).with_trace(TraceMode::On);

    let result = two_grubs().evaluate(&ctx);
    assert!(!result.is_met());
    assert!(result.reason().is_some());
}

#[test]
fn two_grubs_satisfy_two_requirements() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .entities([grub(1), grub(2)])
        .build(&mut clock);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held);

    assert!(two_grubs().evaluate(&ctx).is_met());
}

// =============================================================================
// Trees and Tracing
// =============================================================================

#[test]
fn traced_failure_explains_station_and_memory() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .station(Station::idle("kitchen").running("stew", 3.0))
        .memory("meals", 1)
        .build(&mut clock);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held).with_trace(TraceMode::On);

    let condition = Condition::Any(vec![
        StationCondition::new("kitchen").in_state(StationState::Idle).into(),
        MemoryCondition {
            memory: "meals".to_string(),
            comparison: ">= 3".parse().unwrap(),
        }
        .into(),
    ]);
    let result = condition.evaluate(&ctx);
    let rendered = result.reason().unwrap().render();
    assert!(rendered.contains("no alternative held"), "{rendered}");
    assert!(rendered.contains("station kitchen"), "{rendered}");
    assert!(rendered.contains("memory meals: is 1"), "{rendered}");
}

#[test]
fn cache_is_bypassed_when_tracing() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0).entity(grub(1)).build(&mut clock);
    let held = HeldResources::none();
    let mut engine = ConditionEngine::new();
    engine.observe(snapshot.version());
    let condition = two_grubs();

    let plain = EvalContext::new(&snapshot, &held);
    assert!(!engine.evaluate("pair".into(), &condition, &plain).is_met());
    assert_eq!(engine.cache().len(), 1);

    let traced = plain.with_trace(TraceMode::On);
    let result = engine.evaluate("pair".into(), &condition, &traced);
    assert!(result.reason().is_some());
}

proptest! {
    #[test]
    fn tracing_never_changes_the_result(
        grubs in 0u64..4,
        needed in 1usize..4,
        idle in any::<bool>(),
        meals in 0i64..5,
    ) {
        let mut clock = SnapshotClock::new();
        let station = if idle {
            Station::idle("kitchen")
        } else {
            Station::idle("kitchen").running("stew", 1.0)
        };
        let snapshot = GameStateSnapshot::builder(0)
            .entities((0..grubs).map(grub))
            .station(station)
            .memory("meals", meals)
            .build(&mut clock);
        let held = HeldResources::none();

        let selector = SelectorSpec::element("tiny_grub").into_selector();
        let condition = Condition::All(vec![
            EntitySetCondition::new(vec![selector; needed]).into(),
            Condition::Any(vec![
                StationCondition::new("kitchen").in_state(StationState::Idle).into(),
                Condition::Not(Box::new(
                    MemoryCondition {
                        memory: "meals".to_string(),
                        comparison: ">= 2".parse().unwrap(),
                    }
                    .into(),
                )),
            ]),
        ]);

        let off = EvalContext::new(&snapshot, &held);
        let on = off.with_trace(TraceMode::On);
        let plain = condition.evaluate(&off);
        let traced = condition.evaluate(&on);

        prop_assert_eq!(plain.is_met(), traced.is_met());
        prop_assert!(plain.reason().is_none());
        prop_assert_eq!(traced.reason().is_some(), !traced.is_met());
    }
}
