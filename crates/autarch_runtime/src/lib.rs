//! Runtime layer for Autarch.
//!
//! This crate provides:
//! - [`Orchestrator`] - The per-tick decision cycle
//! - [`RuleExecution`] - One admitted rule driven through its station
//! - [`EngineConfig`] and rule-set loading from TOML
//! - [`Action`] - Commands sent to the host
//! - [`DiagnosticsSink`] - Decision records, archived as `MessagePack`
//! - [`explain()`] - Offline explanation of rule decisions
//! - Snapshot serialization via [`serialize`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod config;
pub mod diagnostics;
pub mod execution;
pub mod explain;
pub mod orchestrator;
pub mod serialize;

pub use actions::Action;
pub use config::{DEFAULT_CONFIG_PATH, EngineConfig, load_rule_set, parse_rule_set};
pub use diagnostics::{
    ArchiveSink, DecisionOutcome, DecisionRecord, DiagnosticsSink, MemorySink, NullSink,
    read_archive,
};
pub use execution::{ExecutionOutcome, ExecutionPhase, RuleExecution};
pub use explain::{RuleExplanation, explain};
pub use orchestrator::{Orchestrator, SnapshotProvider, TickReport};
pub use serialize::{from_bytes, load_from_file, save_to_file, to_bytes};
