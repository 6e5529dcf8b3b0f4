//! Integration tests for Layer 2: Scheduler
//!
//! Tests for action pacing, recovery, heartbeat tasks and continuations.

mod continuations;
mod heartbeat;
mod pacing;
mod recovery;
