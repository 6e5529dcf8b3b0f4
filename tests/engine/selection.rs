//! Entity selection tests

use autarch_engine::{EvalContext, HeldResources, SelectorSpec, WeightBias};
use autarch_foundation::{Entity, EntityId, GameStateSnapshot, SnapshotClock};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

fn grub(id: u64, signature: &str) -> Entity {
    Entity::new(EntityId(id), "tiny_grub")
        .with_aspect("nourishment", 1)
        .with_signature(signature)
}

fn snapshot(entities: Vec<Entity>) -> GameStateSnapshot {
    let mut clock = SnapshotClock::new();
    GameStateSnapshot::builder(0)
        .entities(entities)
        .build(&mut clock)
}

// =============================================================================
// Tie-breaking
// =============================================================================

#[test]
fn smallest_signature_wins_between_equal_grubs() {
    let snapshot = snapshot(vec![grub(1, "b2"), grub(2, "a1")]);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held);
    let selector = SelectorSpec::element("tiny_grub")
        .with_aspect("nourishment", 1)
        .into_selector();

    let chosen = selector.choose_available(&ctx).unwrap();
    assert_eq!(chosen.signature, "a1");
    assert_eq!(chosen.id, EntityId(2));
}

#[test]
fn tie_break_ignores_pool_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let selector = SelectorSpec::element("tiny_grub").into_selector();
    let mut signatures: Vec<String> = (0..20).map(|n| format!("sig{n:02}")).collect();

    for _ in 0..10 {
        signatures.shuffle(&mut rng);
        let entities: Vec<Entity> = signatures
            .iter()
            .enumerate()
            .map(|(n, s)| grub(n as u64, s))
            .collect();
        let snapshot = snapshot(entities);
        let held = HeldResources::none();
        let ctx = EvalContext::new(&snapshot, &held);
        assert_eq!(selector.choose_available(&ctx).unwrap().signature, "sig00");
    }
}

#[test]
fn held_entities_are_skipped() {
    let snapshot = snapshot(vec![grub(1, "a1"), grub(2, "b2")]);
    let held = HeldResources::new([EntityId(1)].into_iter().collect(), Default::default(), 1);
    let ctx = EvalContext::new(&snapshot, &held);
    let selector = SelectorSpec::element("tiny_grub").into_selector();

    assert_eq!(selector.choose_available(&ctx).map(|e| e.id), Some(EntityId(2)));
}

#[test]
fn weight_bias_prefers_heaviest() {
    let snapshot = snapshot(vec![
        grub(1, "a").with_aspect("nourishment", 2),
        grub(2, "b").with_aspect("nourishment", 5),
    ]);
    let held = HeldResources::none();
    let ctx = EvalContext::new(&snapshot, &held);
    let selector = SelectorSpec::element("tiny_grub")
        .with_aspect("nourishment", 1)
        .with_weight_bias(WeightBias::Highest)
        .into_selector();

    assert_eq!(selector.choose_available(&ctx).map(|e| e.id), Some(EntityId(2)));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn choice_is_deterministic(
        lifetimes in prop::collection::vec(0u8..4, 1..30),
        degrees in prop::collection::vec(0u32..3, 30),
    ) {
        let entities: Vec<Entity> = lifetimes
            .iter()
            .zip(&degrees)
            .enumerate()
            .map(|(n, (lifetime, degree))| {
                Entity::new(EntityId(n as u64), "tiny_grub")
                    .with_aspect("nourishment", *degree)
                    .with_lifetime(f32::from(*lifetime))
            })
            .collect();
        let snapshot = snapshot(entities);
        let held = HeldResources::none();
        let ctx = EvalContext::new(&snapshot, &held);
        let selector = SelectorSpec::element("tiny_grub").into_selector();

        let first = selector.choose_available(&ctx).map(|e| e.id);
        for _ in 0..3 {
            prop_assert_eq!(selector.choose_available(&ctx).map(|e| e.id), first);
        }
    }
}
