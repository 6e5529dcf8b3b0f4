//! Snapshot versioning and station aggregation tests

use autarch_foundation::{
    Comparison, Entity, EntityId, EntityLocation, ErrorKind, GameStateSnapshot, Slot,
    SnapshotCell, SnapshotClock, Station, StationState,
};

fn grub(id: u64) -> Entity {
    Entity::new(EntityId(id), "tiny_grub").with_aspect("nourishment", 1)
}

// =============================================================================
// Versions
// =============================================================================

#[test]
fn clock_versions_strictly_increase() {
    let mut clock = SnapshotClock::new();
    let a = GameStateSnapshot::builder(0).build(&mut clock);
    let b = GameStateSnapshot::builder(0).build(&mut clock);
    assert!(b.version() > a.version());
    assert_eq!(clock.last_issued(), Some(b.version()));
}

#[test]
fn handles_are_pinned_to_their_snapshot() {
    let mut clock = SnapshotClock::new();
    let first = GameStateSnapshot::builder(0).entity(grub(1)).build(&mut clock);
    let second = GameStateSnapshot::builder(1).entity(grub(1)).build(&mut clock);

    let handle = first.handle(first.entity(EntityId(1)).unwrap());
    assert_eq!(first.resolve(handle).unwrap().id, EntityId(1));

    let err = second.resolve(handle).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StaleSnapshot { .. }));
}

#[test]
fn cell_refuses_to_go_backwards() {
    let mut clock = SnapshotClock::new();
    let old = GameStateSnapshot::builder(0).build(&mut clock);
    let new = GameStateSnapshot::builder(1).build(&mut clock);
    let new_version = new.version();

    let mut cell = SnapshotCell::new();
    cell.publish(new).unwrap();
    assert!(cell.publish(old).is_err());
    assert_eq!(cell.current().map(|s| s.version()), Some(new_version));
    assert!(cell.require(new_version).is_ok());
}

// =============================================================================
// Stations
// =============================================================================

#[test]
fn station_contents_are_registered_with_locations() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .station(
            Station::idle("kitchen")
                .with_slot(Slot::filled("main", grub(1)))
                .with_stored(grub(2))
                .with_output(Entity::new(EntityId(3), "stew")),
        )
        .build(&mut clock);

    assert_eq!(
        snapshot.entity(EntityId(1)).map(|e| e.location),
        Some(EntityLocation::Slotted)
    );
    assert_eq!(
        snapshot.entity(EntityId(2)).map(|e| e.location),
        Some(EntityLocation::Stored)
    );
    assert_eq!(snapshot.entity_count(), 3);
}

#[test]
fn aggregate_aspects_cover_slotted_and_stored() {
    let station = Station::idle("kitchen")
        .with_slot(Slot::filled("main", grub(1)))
        .with_stored(grub(2).with_aspect("heat", 3))
        .with_output(Entity::new(EntityId(3), "stew").with_aspect("nourishment", 10));

    let aspects = station.aspects();
    assert_eq!(aspects.degree("nourishment"), 2);
    assert_eq!(aspects.degree("heat"), 3);
}

#[test]
fn absent_station_reports_missing() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .station(Station::idle("kitchen").running("stew", 4.0))
        .build(&mut clock);

    assert_eq!(snapshot.station_state(&"kitchen".into()), StationState::Occupied);
    assert_eq!(snapshot.station_state(&"forge".into()), StationState::Missing);
}

#[test]
fn memories_default_to_zero() {
    let mut clock = SnapshotClock::new();
    let snapshot = GameStateSnapshot::builder(0)
        .memory("meals", 2)
        .build(&mut clock);
    assert_eq!(snapshot.memory("meals"), 2);
    assert_eq!(snapshot.memory("never_set"), 0);
}

#[test]
fn comparisons_parse_and_match() {
    let at_least: Comparison = ">= 2".parse().unwrap();
    assert!(at_least.matches(2.0));
    assert!(!at_least.matches(1.5));
    assert!("soon".parse::<Comparison>().is_err());
}
