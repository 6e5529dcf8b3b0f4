//! Integration tests for Layer 0: Foundation
//!
//! Tests for snapshots, stations, comparisons and errors.

mod snapshots;
