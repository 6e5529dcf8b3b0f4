//! Declarative rule definitions as loaded from configuration.
//!
//! These types mirror the on-disk format one to one and carry no validation.
//! The [`DeclarationCompiler`](crate::compiler::DeclarationCompiler) turns them
//! into engine types and rejects anything malformed.
//!
//! Conditions are a tagged union discriminated by `type`:
//!
//! ```toml
//! [goals.rules.requirements]
//! type = "station"
//! station = "work"
//! state = "idle"
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::selector::{LifetimeBias, WeightBias};

// =============================================================================
// Conditions
// =============================================================================

/// A condition node.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionDecl {
    /// Every child must hold.
    All {
        /// Children.
        conditions: Vec<ConditionDecl>,
    },
    /// Some child must hold.
    Any {
        /// Children.
        conditions: Vec<ConditionDecl>,
    },
    /// The child must not hold.
    Not {
        /// Negated condition.
        condition: Box<ConditionDecl>,
    },
    /// Every selector must find a distinct available entity.
    Entities {
        /// Selectors, matched in order.
        choose: Vec<SelectorDecl>,
    },
    /// Requirements on a station.
    Station(StationConditionDecl),
    /// Compares a memory counter.
    Memory {
        /// Memory name.
        memory: String,
        /// Comparison string such as `">= 2"`.
        compare: String,
    },
}

/// Station requirements.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConditionDecl {
    /// Station id. Required.
    pub station: Option<String>,
    /// Required state.
    pub state: Option<StationStateDecl>,
    /// Required running recipe.
    pub recipe: Option<String>,
    /// Comparison on the recipe's remaining seconds.
    pub time_remaining: Option<String>,
    /// Selectors over stored entities.
    pub stored: Option<Vec<SelectorDecl>>,
    /// Selectors over slotted entities.
    pub slotted: Option<Vec<SelectorDecl>>,
    /// Selectors over slotted and stored entities.
    pub contents: Option<Vec<SelectorDecl>>,
    /// Aspect name to comparison over the summed degrees of the contents.
    #[serde(default)]
    pub contained_aspects: BTreeMap<String, String>,
}

/// Station state names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStateDecl {
    /// Absent from the snapshot.
    Missing,
    /// Present and idle.
    Idle,
    /// Running a recipe.
    Occupied,
}

// =============================================================================
// Selectors
// =============================================================================

/// Entity locations, plus `any`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationDecl {
    /// Every location.
    Any,
    /// On the table.
    Table,
    /// Moving.
    InTransit,
    /// In a station slot.
    Slotted,
    /// Inside a station.
    Stored,
    /// In a portal.
    Portal,
}

/// An entity selector.
///
/// Either a filter (the plain fields) or a `first_of` list of alternatives,
/// never both.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorDecl {
    /// Exact element.
    pub element: Option<String>,
    /// Allowed elements.
    pub elements: Option<Vec<String>>,
    /// Elements never chosen.
    #[serde(default)]
    pub forbidden_elements: Vec<String>,
    /// Allowed locations. Defaults depend on where the selector is used.
    #[serde(default)]
    pub locations: Vec<LocationDecl>,
    /// Comparison on remaining lifetime.
    pub lifetime: Option<String>,
    /// Minimum degree per aspect.
    #[serde(default)]
    pub aspects: BTreeMap<String, u32>,
    /// Aspects that disqualify an entity.
    #[serde(default)]
    pub forbidden_aspects: Vec<String>,
    /// Required uniqueness flag.
    pub unique: Option<bool>,
    /// Candidates must also be chosen by this selector.
    pub from: Option<Box<SelectorDecl>>,
    /// Weight preference.
    pub weight_bias: Option<WeightBias>,
    /// Lifetime preference.
    pub lifetime_bias: Option<LifetimeBias>,
    /// Alternatives; the first with a result wins.
    #[serde(default)]
    pub first_of: Vec<SelectorDecl>,
    /// Gate; the selector yields nothing unless this holds.
    pub when: Option<Box<ConditionDecl>>,
}

impl SelectorDecl {
    /// Returns true if any filter or ordering field is set.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.element.is_some()
            || self.elements.is_some()
            || !self.forbidden_elements.is_empty()
            || !self.locations.is_empty()
            || self.lifetime.is_some()
            || !self.aspects.is_empty()
            || !self.forbidden_aspects.is_empty()
            || self.unique.is_some()
            || self.from.is_some()
            || self.weight_bias.is_some()
            || self.lifetime_bias.is_some()
    }
}

// =============================================================================
// Rules and Goals
// =============================================================================

/// A rule: when to use a station and what to put into it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    /// Rule name, unique within a rule set.
    pub name: String,
    /// Target station.
    pub station: Option<String>,
    /// Higher priorities are considered first.
    #[serde(default)]
    pub priority: i32,
    /// Must hold for the rule to start.
    pub requirements: Option<ConditionDecl>,
    /// Must not hold for the rule to start.
    pub forbidders: Option<ConditionDecl>,
    /// Slot id to selector for the starting slots.
    #[serde(default)]
    pub slots: BTreeMap<String, SelectorDecl>,
    /// Recipe id to (slot id to selector) for slots opened while running.
    #[serde(default)]
    pub recipes: BTreeMap<String, BTreeMap<String, SelectorDecl>>,
}

/// A goal and the rules that pursue it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalDecl {
    /// Goal name.
    pub name: String,
    /// Must hold for the goal to be pursued.
    pub requirements: Option<ConditionDecl>,
    /// The goal is done once this holds.
    pub completion: Option<ConditionDecl>,
    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

/// A complete rule file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetDecl {
    /// Goals in declaration order.
    #[serde(default)]
    pub goals: Vec<GoalDecl>,
}
