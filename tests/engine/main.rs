//! Integration tests for Layer 1: Engine
//!
//! Tests for entity selection, conditions, reservation ledgers and rule
//! declarations.

mod conditions;
mod declarations;
mod reservations;
mod selection;
