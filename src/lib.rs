//! Autarch - Autonomous decision engine
//!
//! This crate re-exports all layers of the Autarch system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: autarch_runtime     : Orchestrator, rule execution, config, diagnostics, CLI
//! Layer 2: autarch_scheduler   : Heartbeat tasks, action actor, recovery, continuations
//! Layer 1: autarch_engine      : Conditions, entity selection, reservation ledgers
//! Layer 0: autarch_foundation  : Entities, stations, snapshots, errors
//! ```

pub use autarch_engine as engine;
pub use autarch_foundation as foundation;
pub use autarch_runtime as runtime;
pub use autarch_scheduler as scheduler;
