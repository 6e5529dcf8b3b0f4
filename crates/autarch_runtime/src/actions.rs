//! Domain actions sent to the host.

use std::fmt;

use serde::{Deserialize, Serialize};

use autarch_foundation::{EntityId, StationId};
use autarch_scheduler::ActionList;

/// A single command the host performs on behalf of the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move an entity into a station slot.
    Slot {
        /// Target station.
        station: StationId,
        /// Slot id on the station.
        slot: String,
        /// Entity to move.
        entity: EntityId,
    },
    /// Start the station with whatever is slotted.
    Start {
        /// Target station.
        station: StationId,
    },
    /// Move the station's output back to the table.
    CollectOutput {
        /// Target station.
        station: StationId,
    },
    /// Close the station, returning slotted entities.
    Close {
        /// Target station.
        station: StationId,
    },
}

impl Action {
    /// The station this action targets.
    #[must_use]
    pub fn station(&self) -> &StationId {
        match self {
            Self::Slot { station, .. }
            | Self::Start { station }
            | Self::CollectOutput { station }
            | Self::Close { station } => station,
        }
    }

    /// Sequence that slots every entity and then starts the station.
    #[must_use]
    pub fn start_sequence<I>(station: &StationId, slots: I) -> ActionList<Self>
    where
        I: IntoIterator<Item = (String, EntityId)>,
    {
        let mut actions: Vec<Self> = slots
            .into_iter()
            .map(|(slot, entity)| Self::Slot {
                station: station.clone(),
                slot,
                entity,
            })
            .collect();
        actions.push(Self::Start {
            station: station.clone(),
        });
        ActionList::new(actions)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot {
                station,
                slot,
                entity,
            } => write!(f, "slot {entity} into {station}/{slot}"),
            Self::Start { station } => write!(f, "start {station}"),
            Self::CollectOutput { station } => write!(f, "collect output of {station}"),
            Self::Close { station } => write!(f, "close {station}"),
        }
    }
}
