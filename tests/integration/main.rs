//! End-to-end tests: the orchestrator driving a simulated host world.

mod diagnostics;
mod lifecycle;
mod offline;
mod world;
