//! Rule declaration tests

use autarch_engine::{ConditionEngine, EvalContext, GoalStatus, HeldResources, TraceMode};
use autarch_foundation::{
    Entity, EntityId, EntityLocation, ErrorKind, GameStateSnapshot, SnapshotClock, Station,
};
use autarch_runtime::parse_rule_set;

fn assert_rejected(source: &str, needle: &str) {
    let err = parse_rule_set(source).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Configuration(_)), "{err:?}");
    let rendered = format!("{err} {:?}", err.context);
    assert!(rendered.contains(needle), "{rendered} does not mention {needle}");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn duplicate_rule_names_are_rejected() {
    assert_rejected(
        r#"
        [[goals]]
        name = "a"
        [[goals.rules]]
        name = "cook"
        station = "kitchen"
        [goals.rules.slots.main]
        element = "grub"

        [[goals]]
        name = "b"
        [[goals.rules]]
        name = "cook"
        station = "forge"
        [goals.rules.slots.main]
        element = "ore"
        "#,
        "duplicate rule name 'cook'",
    );
}

#[test]
fn rule_without_slots_is_rejected() {
    assert_rejected(
        r#"
        [[goals]]
        name = "a"
        [[goals.rules]]
        name = "cook"
        station = "kitchen"
        "#,
        "no starting slots",
    );
}

#[test]
fn contradictory_selector_is_rejected() {
    assert_rejected(
        r#"
        [[goals]]
        name = "a"
        [[goals.rules]]
        name = "cook"
        station = "kitchen"
        [goals.rules.slots.main]
        element = "grub"
        aspects = { rot = 1 }
        forbidden_aspects = ["rot"]
        "#,
        "requires and forbids aspect 'rot'",
    );
}

#[test]
fn bad_comparison_is_rejected() {
    assert_rejected(
        r#"
        [[goals]]
        name = "a"
        requirements = { type = "memory", memory = "meals", compare = ">= lots" }
        "#,
        "invalid comparison",
    );
}

#[test]
fn unknown_condition_type_is_rejected() {
    assert_rejected(
        r#"
        [[goals]]
        name = "a"
        requirements = { type = "weather" }
        "#,
        "configuration error",
    );
}

// =============================================================================
// Compiled Behaviour
// =============================================================================

const KITCHEN: &str = r#"
    [[goals]]
    name = "feed"
    completion = { type = "memory", memory = "meals", compare = ">= 3" }

    [[goals.rules]]
    name = "cook"
    station = "kitchen"
    [goals.rules.slots.main]
    first_of = [{ element = "fat_grub" }, { element = "tiny_grub" }]
"#;

#[test]
fn board_slots_default_to_table_entities() {
    let goals = parse_rule_set(KITCHEN).unwrap();
    let rule = &goals[0].rules[0];
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .entity(Entity::new(EntityId(1), "fat_grub").with_location(EntityLocation::InTransit))
        .entity(Entity::new(EntityId(2), "tiny_grub"))
        .station(Station::idle("kitchen"))
        .build(&mut clock);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held);

    let chosen = rule.choose_slots(&ctx).unwrap();
    assert_eq!(chosen[0].1.id, EntityId(2));
}

#[test]
fn goal_completes_from_memory() {
    let goals = parse_rule_set(KITCHEN).unwrap();
    let mut engine = ConditionEngine::new();
    let held = HeldResources::none();
    let mut clock = SnapshotClock::new();

    for (meals, expected) in [(2, GoalStatus::Active), (3, GoalStatus::Complete)] {
        let snapshot = GameStateSnapshot::builder(0)
            .memory("meals", meals)
            .build(&mut clock);
        engine.observe(snapshot.version());
        let ctx = EvalContext::new(&snapshot, &held);
        assert_eq!(goals[0].status(&mut engine, &ctx), expected);
    }
}

#[test]
fn occupied_station_blocks_admission() {
    let goals = parse_rule_set(KITCHEN).unwrap();
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .entity(Entity::new(EntityId(1), "tiny_grub"))
        .station(Station::idle("kitchen").running("stew", 4.0))
        .build(&mut clock);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held).with_trace(TraceMode::On);

    let mut engine = ConditionEngine::new();
    let result = goals[0].rules[0].admission(&mut engine, &ctx);
    assert!(!result.is_met());
    let rendered = result.reason().unwrap().render();
    assert!(rendered.contains("rule cook cannot start"), "{rendered}");
    assert!(rendered.contains("station kitchen"), "{rendered}");
}
