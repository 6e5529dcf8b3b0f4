//! Entity snapshots.
//!
//! Entities are immutable values taken once per tick. They are never mutated,
//! only superseded by the entity of the next snapshot.

use std::fmt;

use crate::aspects::Aspects;
use crate::ids::{ElementId, EntityId};

/// Where an entity currently sits in the simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntityLocation {
    /// Lying on the table, free to be picked up.
    Table,
    /// Moving between locations.
    InTransit,
    /// Placed in a station slot.
    Slotted,
    /// Held inside a station (stored or output).
    Stored,
    /// Inside a portal.
    Portal,
}

impl fmt::Display for EntityLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::InTransit => "in-transit",
            Self::Slotted => "slotted",
            Self::Stored => "stored",
            Self::Portal => "portal",
        };
        f.write_str(name)
    }
}

/// Read-only snapshot of a single entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    /// Unique instance identity.
    pub id: EntityId,
    /// Kind identity shared by every instance of this element.
    pub element: ElementId,
    /// Weighted tags.
    pub aspects: Aspects,
    /// Remaining lifetime in seconds. Zero means the entity does not decay.
    pub lifetime: f32,
    /// Current location.
    pub location: EntityLocation,
    /// Whether the element is unique.
    pub unique: bool,
    /// Deterministic tie-break key.
    pub signature: String,
}

impl Entity {
    /// Creates an entity on the table with no aspects and no decay.
    #[must_use]
    pub fn new(id: EntityId, element: impl Into<ElementId>) -> Self {
        let element = element.into();
        let signature = Self::derive_signature(&element, id);
        Self {
            id,
            element,
            aspects: Aspects::new(),
            lifetime: 0.0,
            location: EntityLocation::Table,
            unique: false,
            signature,
        }
    }

    /// Default signature: element then zero-padded id, so that lexical order
    /// matches numeric id order within one element.
    #[must_use]
    pub fn derive_signature(element: &ElementId, id: EntityId) -> String {
        format!("{element}:{:020}", id.raw())
    }

    /// Sets one aspect.
    #[must_use]
    pub fn with_aspect(mut self, name: impl Into<String>, degree: u32) -> Self {
        self.aspects = self.aspects.with(name, degree);
        self
    }

    /// Replaces the aspects.
    #[must_use]
    pub fn with_aspects(mut self, aspects: Aspects) -> Self {
        self.aspects = aspects;
        self
    }

    /// Sets the remaining lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: EntityLocation) -> Self {
        self.location = location;
        self
    }

    /// Sets the uniqueness flag.
    #[must_use]
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Overrides the derived signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Returns true if this entity decays over time.
    #[must_use]
    pub fn decays(&self) -> bool {
        self.lifetime > 0.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.element, self.id.raw())
    }
}
