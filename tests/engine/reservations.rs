//! Reservation ledger tests

use std::collections::HashSet;

use autarch_engine::{
    DisposalFlag, FixedConstraint, Reservations, ResourceLedger, SelectorConstraint, SelectorSpec,
};
use autarch_foundation::{Entity, EntityId, ErrorKind, GameStateSnapshot, SnapshotClock, StationId};
use proptest::prelude::*;

fn one_grub() -> GameStateSnapshot {
    let mut clock = SnapshotClock::new();
    GameStateSnapshot::builder(0)
        .entity(Entity::new(EntityId(1), "tiny_grub"))
        .build(&mut clock)
}

fn grub_claim(label: &str) -> Box<SelectorConstraint> {
    Box::new(SelectorConstraint::new(
        label,
        SelectorSpec::element("tiny_grub").into_selector(),
    ))
}

// =============================================================================
// Claims
// =============================================================================

#[test]
fn second_claim_on_single_candidate_fails() {
    let snapshot = one_grub();
    let mut ledger = ResourceLedger::new();

    let first = ledger.try_add_constraint(grub_claim("first"), &snapshot);
    assert!(first.is_some());
    assert!(ledger.try_add_constraint(grub_claim("second"), &snapshot).is_none());

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.resolve(first.unwrap(), &snapshot), Some(EntityId(1)));
}

#[test]
fn rejected_claim_reports_conflict() {
    let snapshot = one_grub();
    let mut ledger = ResourceLedger::new();
    ledger.add_constraint(grub_claim("first"), &snapshot).unwrap();

    let err = ledger.add_constraint(grub_claim("second"), &snapshot).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReservationConflict(_)));
    assert!(err.to_string().contains("second"));
}

#[test]
fn disposal_frees_the_resource() {
    let snapshot = one_grub();
    let mut ledger = ResourceLedger::new();
    let flag = DisposalFlag::new();
    let claim = SelectorConstraint::new("first", SelectorSpec::element("tiny_grub").into_selector())
        .with_disposal(flag.clone());
    ledger.try_add_constraint(Box::new(claim), &snapshot).unwrap();

    flag.dispose();
    assert!(ledger.try_add_constraint(grub_claim("second"), &snapshot).is_some());
    assert_eq!(ledger.len(), 1);
}

#[test]
fn flexible_claim_moves_aside_for_an_urgent_one() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .entities([
            Entity::new(EntityId(1), "tiny_grub"),
            Entity::new(EntityId(2), "tiny_grub"),
        ])
        .build(&mut clock);
    let mut ledger = ResourceLedger::new();

    let flexible = ledger.try_add_constraint(grub_claim("flexible"), &snapshot).unwrap();
    assert_eq!(ledger.resolve(flexible, &snapshot), Some(EntityId(1)));

    // A claim whose only candidate is held never gets in, whatever its priority.
    let pinned = FixedConstraint::new("pinned", vec![EntityId(1)]).with_priority(10);
    assert!(ledger.try_add_constraint(Box::new(pinned), &snapshot).is_none());

    let urgent = ledger
        .try_add_constraint(
            Box::new(FixedConstraint::new("urgent", vec![EntityId(1), EntityId(2)]).with_priority(10)),
            &snapshot,
        )
        .unwrap();
    assert_eq!(ledger.resolve(urgent, &snapshot), Some(EntityId(1)));
    assert_eq!(ledger.resolve(flexible, &snapshot), Some(EntityId(2)));
}

#[test]
fn held_resources_reflect_both_ledgers() {
    let snapshot = one_grub();
    let mut reservations = Reservations::new();
    reservations
        .stations
        .add_constraint(
            Box::new(FixedConstraint::new("kitchen", vec![StationId::new("kitchen")])),
            &snapshot,
        )
        .unwrap();
    reservations.entities.add_constraint(grub_claim("grub"), &snapshot).unwrap();

    let held = reservations.held(&snapshot);
    assert!(!held.is_station_available(&StationId::new("kitchen")));
    assert!(held.is_station_available(&StationId::new("forge")));
    assert!(!held.is_entity_available(EntityId(1)));
    assert_eq!(held.revision(), reservations.revision());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn accepted_claims_never_share_a_resource(
        claims in prop::collection::vec(
            (prop::collection::vec(0u8..5, 1..4), -2i32..3),
            1..12,
        ),
    ) {
        let mut clock = SnapshotClock::new();
        let snapshot = GameStateSnapshot::builder(0).build(&mut clock);
        let mut ledger = ResourceLedger::new();

        for (n, (candidates, priority)) in claims.iter().enumerate() {
            let stations = candidates
                .iter()
                .map(|c| StationId::new(format!("station{c}")))
                .collect();
            let constraint = FixedConstraint::new(format!("claim{n}"), stations)
                .with_priority(*priority);
            let _ = ledger.try_add_constraint(Box::new(constraint), &snapshot);

            let assignments = ledger.assignments(&snapshot);
            prop_assert_eq!(assignments.len(), ledger.len());
            let distinct: HashSet<_> = assignments.iter().map(|(_, s)| s.clone()).collect();
            prop_assert_eq!(distinct.len(), assignments.len());
        }
    }
}
