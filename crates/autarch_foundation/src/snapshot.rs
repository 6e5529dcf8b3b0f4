//! Immutable, versioned game state snapshots.
//!
//! A snapshot is produced once at the start of each orchestration cycle.
//! Cloning is O(1) thanks to structural sharing in `im` maps. Every snapshot
//! carries a [`SnapshotVersion`]; handles taken from one snapshot are rejected
//! when resolved against another.

use std::fmt;
use std::sync::Arc;

use crate::entity::{Entity, EntityLocation};
use crate::error::{Error, Result};
use crate::ids::{EntityId, StationId};
use crate::station::{Station, StationState};

// =============================================================================
// Versions
// =============================================================================

/// Monotonic snapshot version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotVersion(u64);

impl SnapshotVersion {
    /// Creates a version from a raw number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw number.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Issues strictly increasing snapshot versions.
#[derive(Debug, Default)]
pub struct SnapshotClock {
    last: u64,
}

impl SnapshotClock {
    /// Creates a clock whose first version is `v1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next version. Never returns the same version twice.
    pub fn next_version(&mut self) -> SnapshotVersion {
        self.last += 1;
        SnapshotVersion(self.last)
    }

    /// The most recently issued version, if any.
    #[must_use]
    pub fn last_issued(&self) -> Option<SnapshotVersion> {
        (self.last > 0).then_some(SnapshotVersion(self.last))
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Reference to an entity within one specific snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    /// The entity.
    pub id: EntityId,
    /// The snapshot the entity was observed in.
    pub version: SnapshotVersion,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable aggregate of all entities, stations and memories at one instant.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameStateSnapshot {
    version: SnapshotVersion,
    tick: u64,
    entities: im::OrdMap<EntityId, Entity>,
    stations: im::OrdMap<StationId, Station>,
    memories: im::OrdMap<String, i64>,
}

impl GameStateSnapshot {
    /// Starts building a snapshot for the given host tick.
    #[must_use]
    pub fn builder(tick: u64) -> SnapshotBuilder {
        SnapshotBuilder::new(tick)
    }

    /// Returns the snapshot version.
    #[must_use]
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Returns the host tick the snapshot was taken at.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Iterates over every entity in id order, including entities inside stations.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns a handle to an entity pinned to this snapshot.
    #[must_use]
    pub fn handle(&self, entity: &Entity) -> EntityHandle {
        EntityHandle {
            id: entity.id,
            version: self.version,
        }
    }

    /// Resolves a handle.
    ///
    /// # Errors
    /// Returns `StaleSnapshot` if the handle was taken from another snapshot,
    /// or `EntityNotFound` if the entity is absent.
    pub fn resolve(&self, handle: EntityHandle) -> Result<&Entity> {
        self.check_version(handle.version)?;
        self.entity(handle.id)
            .ok_or_else(|| Error::entity_not_found(handle.id))
    }

    /// Fails fast when `version` is not this snapshot's version.
    ///
    /// # Errors
    /// Returns `StaleSnapshot` on mismatch.
    pub fn check_version(&self, version: SnapshotVersion) -> Result<()> {
        if version == self.version {
            Ok(())
        } else {
            Err(Error::stale_snapshot(version, self.version))
        }
    }

    /// Iterates over every station in id order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Looks up a station by id.
    #[must_use]
    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    /// State of a station, `Missing` if absent.
    #[must_use]
    pub fn station_state(&self, id: &StationId) -> StationState {
        self.station(id)
            .map_or(StationState::Missing, |station| station.state)
    }

    /// Value of a memory counter, zero if unset.
    #[must_use]
    pub fn memory(&self, name: &str) -> i64 {
        self.memories.get(name).copied().unwrap_or(0)
    }

    /// Iterates over every memory in name order.
    pub fn memories(&self) -> impl Iterator<Item = (&str, i64)> {
        self.memories.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`GameStateSnapshot`].
///
/// Entities contained in stations are registered in the entity table with a
/// location matching where the station holds them.
#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    tick: u64,
    entities: im::OrdMap<EntityId, Entity>,
    stations: im::OrdMap<StationId, Station>,
    memories: im::OrdMap<String, i64>,
}

impl SnapshotBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Adds an entity. A later entity with the same id replaces an earlier one.
    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.id, entity);
        self
    }

    /// Adds several entities.
    #[must_use]
    pub fn entities<I: IntoIterator<Item = Entity>>(self, entities: I) -> Self {
        entities.into_iter().fold(self, Self::entity)
    }

    /// Adds a station and registers the entities it holds.
    #[must_use]
    pub fn station(mut self, mut station: Station) -> Self {
        for slot in &mut station.slots {
            if let Some(entity) = &mut slot.entity {
                entity.location = EntityLocation::Slotted;
                self.entities.insert(entity.id, entity.clone());
            }
        }
        for entity in station.stored.iter_mut().chain(station.output.iter_mut()) {
            entity.location = EntityLocation::Stored;
            self.entities.insert(entity.id, entity.clone());
        }
        self.stations.insert(station.id.clone(), station);
        self
    }

    /// Sets a memory counter.
    #[must_use]
    pub fn memory(mut self, name: impl Into<String>, value: i64) -> Self {
        self.memories.insert(name.into(), value);
        self
    }

    /// Finishes the snapshot, stamping it with the clock's next version.
    #[must_use]
    pub fn build(self, clock: &mut SnapshotClock) -> GameStateSnapshot {
        GameStateSnapshot {
            version: clock.next_version(),
            tick: self.tick,
            entities: self.entities,
            stations: self.stations,
            memories: self.memories,
        }
    }
}

// =============================================================================
// Current Snapshot Cell
// =============================================================================

/// Holds the current snapshot and refuses to go backwards.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCell {
    current: Option<Arc<GameStateSnapshot>>,
}

impl SnapshotCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a snapshot as current.
    ///
    /// # Errors
    /// Returns `StaleSnapshot` when the snapshot is not newer than the current one.
    pub fn publish(&mut self, snapshot: GameStateSnapshot) -> Result<Arc<GameStateSnapshot>> {
        if let Some(current) = &self.current {
            if snapshot.version <= current.version {
                return Err(Error::stale_snapshot(snapshot.version, current.version));
            }
        }
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The current snapshot, if one was published.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<GameStateSnapshot>> {
        self.current.as_ref()
    }

    /// Returns the current snapshot if it has the given version.
    ///
    /// # Errors
    /// Returns `StaleSnapshot` on mismatch, `Internal` if nothing was published.
    pub fn require(&self, version: SnapshotVersion) -> Result<&Arc<GameStateSnapshot>> {
        let current = self.current.as_ref().ok_or_else(|| {
            Error::new(crate::error::ErrorKind::Internal(
                "no snapshot has been published".to_string(),
            ))
        })?;
        current.check_version(version)?;
        Ok(current)
    }
}
