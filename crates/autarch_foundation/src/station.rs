//! Station snapshots.
//!
//! A station hosts a process (recipe). It has slots that accept entities,
//! and holds stored and output entities while it works.

use std::fmt;

use crate::aspects::Aspects;
use crate::entity::Entity;
use crate::ids::{RecipeId, StationId};

/// Operational state of a station.
///
/// `Missing` is never stored on a [`Station`]; it is what a snapshot reports
/// for a station id it does not contain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StationState {
    /// The station is not present.
    Missing,
    /// Present and not running a recipe.
    Idle,
    /// Running a recipe.
    Occupied,
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Missing => "missing",
            Self::Idle => "idle",
            Self::Occupied => "occupied",
        };
        f.write_str(name)
    }
}

/// A single slot of a station.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// Slot identifier, unique within the station.
    pub id: String,
    /// The entity filling the slot, if any.
    pub entity: Option<Entity>,
}

impl Slot {
    /// Creates an empty slot.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity: None,
        }
    }

    /// Creates a filled slot.
    #[must_use]
    pub fn filled(id: impl Into<String>, entity: Entity) -> Self {
        Self {
            id: id.into(),
            entity: Some(entity),
        }
    }
}

/// Read-only snapshot of a station.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Station {
    /// Station identity.
    pub id: StationId,
    /// Current state; never `Missing`.
    pub state: StationState,
    /// The recipe currently running.
    pub recipe: Option<RecipeId>,
    /// Seconds left on the current recipe.
    pub time_remaining: f32,
    /// Slots in display order.
    pub slots: Vec<Slot>,
    /// Entities held inside the station while it works.
    pub stored: Vec<Entity>,
    /// Entities produced and waiting to be collected.
    pub output: Vec<Entity>,
}

impl Station {
    /// Creates an idle station with no slots.
    #[must_use]
    pub fn idle(id: impl Into<StationId>) -> Self {
        Self {
            id: id.into(),
            state: StationState::Idle,
            recipe: None,
            time_remaining: 0.0,
            slots: Vec::new(),
            stored: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Marks the station as running a recipe.
    #[must_use]
    pub fn running(mut self, recipe: impl Into<RecipeId>, time_remaining: f32) -> Self {
        self.state = StationState::Occupied;
        self.recipe = Some(recipe.into());
        self.time_remaining = time_remaining;
        self
    }

    /// Adds a slot.
    #[must_use]
    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Adds a stored entity.
    #[must_use]
    pub fn with_stored(mut self, entity: Entity) -> Self {
        self.stored.push(entity);
        self
    }

    /// Adds an output entity.
    #[must_use]
    pub fn with_output(mut self, entity: Entity) -> Self {
        self.output.push(entity);
        self
    }

    /// Finds a slot by id.
    #[must_use]
    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Entities currently in slots.
    pub fn slotted(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(|s| s.entity.as_ref())
    }

    /// Slotted entities followed by stored entities.
    pub fn contents(&self) -> impl Iterator<Item = &Entity> {
        self.slotted().chain(self.stored.iter())
    }

    /// Every entity the station holds, including output.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.contents().chain(self.output.iter())
    }

    /// Aggregate aspects over the contents (slotted and stored).
    #[must_use]
    pub fn aspects(&self) -> Aspects {
        self.contents()
            .fold(Aspects::new(), |acc, e| acc.merge(&e.aspects))
    }

    /// Returns true if the station has output waiting.
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }
}
