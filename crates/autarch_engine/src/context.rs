//! Evaluation context shared by conditions and selectors.

use std::collections::HashSet;

use autarch_foundation::{Entity, EntityId, GameStateSnapshot, StationId};

use crate::result::TraceMode;

/// Resources currently held by registered constraints.
///
/// Built once per query from the ledgers so that availability checks inside
/// a condition never recompute the assignment.
#[derive(Clone, Debug, Default)]
pub struct HeldResources {
    entities: HashSet<EntityId>,
    stations: HashSet<StationId>,
    revision: u64,
}

impl HeldResources {
    /// A view in which nothing is held.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a view from held sets and the combined ledger revision.
    #[must_use]
    pub fn new(entities: HashSet<EntityId>, stations: HashSet<StationId>, revision: u64) -> Self {
        Self {
            entities,
            stations,
            revision,
        }
    }

    /// Returns true if no constraint holds the entity.
    #[must_use]
    pub fn is_entity_available(&self, id: EntityId) -> bool {
        !self.entities.contains(&id)
    }

    /// Returns true if no constraint holds the station.
    #[must_use]
    pub fn is_station_available(&self, id: &StationId) -> bool {
        !self.stations.contains(id)
    }

    /// Ledger revision this view was computed at.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of held entities.
    #[must_use]
    pub fn held_entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Everything a condition needs to evaluate.
#[derive(Copy, Clone, Debug)]
pub struct EvalContext<'a> {
    /// The snapshot being evaluated.
    pub snapshot: &'a GameStateSnapshot,
    /// What the ledgers currently hold.
    pub held: &'a HeldResources,
    /// Whether to build failure explanations.
    pub trace: TraceMode,
}

impl<'a> EvalContext<'a> {
    /// Creates an untraced context.
    #[must_use]
    pub fn new(snapshot: &'a GameStateSnapshot, held: &'a HeldResources) -> Self {
        Self {
            snapshot,
            held,
            trace: TraceMode::Off,
        }
    }

    /// Returns a copy of this context with the given trace mode.
    #[must_use]
    pub fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    /// Entities no constraint holds, in id order.
    #[must_use]
    pub fn available_entities(&self) -> Vec<&'a Entity> {
        self.snapshot
            .entities()
            .filter(|e| self.held.is_entity_available(e.id))
            .collect()
    }
}
