//! Conditions, entity selection, declarations and resource reservation for Autarch.
//!
//! This crate provides:
//! - [`Condition`] - Compound and atomic conditions with optional failure traces
//! - [`EntitySelector`] - Deterministic best-match entity selection
//! - [`ConditionEngine`] - Evaluation with a per-snapshot result cache
//! - [`ResourceLedger`] - Exclusive reservations against competing constraints
//! - [`DeclarationCompiler`] - Validation of declarative goals and rules

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compiler;
pub mod condition;
pub mod context;
pub mod declaration;
pub mod evaluator;
pub mod ledger;
pub mod result;
pub mod rule;
pub mod selector;

pub use compiler::{DeclarationCompiler, SelectorScope};
pub use condition::{
    Condition, EntitySetCondition, GameStateCondition, MemoryCondition, StationCondition,
    consume_match,
};
pub use context::{EvalContext, HeldResources};
pub use declaration::{ConditionDecl, GoalDecl, RuleDecl, RuleSetDecl, SelectorDecl};
pub use evaluator::{CacheStats, ConditionCache, ConditionEngine, ConditionKey};
pub use ledger::{
    ConstraintId, DisposalFlag, FixedConstraint, Reservations, ResourceConstraint,
    ResourceLedger, SelectorConstraint,
};
pub use result::{CompoundMode, ConditionResult, FailureReason, TraceMode};
pub use rule::{CompiledRule, Goal, GoalStatus, SlotAssignment};
pub use selector::{ElementMatch, EntitySelector, LifetimeBias, SelectorSpec, WeightBias};
