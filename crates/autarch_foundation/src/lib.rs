//! Core types for Autarch: entities, stations, snapshots and errors.
//!
//! This crate provides:
//! - [`Entity`] and [`Station`] - Read-only snapshots of simulated objects
//! - [`Aspects`] - Persistent weighted tags
//! - [`GameStateSnapshot`] - Versioned, immutable world state
//! - [`Comparison`] - Threshold comparisons used by filters and conditions
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aspects;
pub mod compare;
pub mod entity;
pub mod error;
pub mod ids;
pub mod snapshot;
pub mod station;

pub use aspects::Aspects;
pub use compare::{CompareOp, Comparison};
pub use entity::{Entity, EntityLocation};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use ids::{ElementId, EntityId, RecipeId, StationId};
pub use snapshot::{
    EntityHandle, GameStateSnapshot, SnapshotBuilder, SnapshotCell, SnapshotClock,
    SnapshotVersion,
};
pub use station::{Slot, Station, StationState};
