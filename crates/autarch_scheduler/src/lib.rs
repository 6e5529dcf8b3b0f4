//! Tick-driven scheduling for Autarch.
//!
//! This crate provides:
//! - [`Heartbeat`] - A task table advanced once per host tick
//! - [`WaitUntil`], [`Delay`], [`Timeout`] - Heartbeat primitives
//! - [`ActionActor`] - Executes queued action sequences, one action per tick
//! - [`Recovering`] - Substitutes a recovery sequence after a failure
//! - [`ContinuationQueue`] - Hands background results back to the tick thread
//!
//! Everything here is single-threaded and cooperative. Cancellation is
//! observed at tick boundaries and never rolls back executed actions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor;
pub mod continuation;
pub mod heartbeat;
pub mod recovery;
pub mod task;

pub use actor::{
    ActionActor, ActionList, ActionSequence, ActionSink, ActorReport, PendingActionSequence,
    SequenceId, SequenceSummary,
};
pub use continuation::{Continuation, ContinuationQueue, ContinuationSender};
pub use heartbeat::{Delay, Heartbeat, HeartbeatWork, Step, TaskId, Timeout, WaitUntil};
pub use recovery::{Recovering, RecoveryFn};
pub use task::{CancellationToken, TaskHandle, TaskOutcome, TaskState, Tick};
