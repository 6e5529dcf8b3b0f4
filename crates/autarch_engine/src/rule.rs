//! Compiled goals and rules.
//!
//! A rule is admissible when its station is idle and unreserved, its
//! requirements hold, its forbidders do not, and every starting slot can be
//! filled with a distinct available entity.

use std::collections::BTreeMap;

use autarch_foundation::{Entity, RecipeId, StationId, StationState};

use crate::condition::{Condition, consume_match};
use crate::context::EvalContext;
use crate::evaluator::{ConditionEngine, ConditionKey};
use crate::result::{ConditionResult, FailureReason};
use crate::selector::EntitySelector;

// =============================================================================
// Rules
// =============================================================================

/// A station slot and the selector that fills it.
#[derive(Clone, Debug)]
pub struct SlotAssignment {
    /// Slot id on the station.
    pub slot: String,
    /// Selector for the entity to slot.
    pub selector: EntitySelector,
}

/// A validated rule.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    /// Rule name, unique within the rule set.
    pub name: String,
    /// Name of the owning goal.
    pub goal: String,
    /// Higher priorities are considered first.
    pub priority: i32,
    /// Target station.
    pub station: StationId,
    /// Must hold to start.
    pub requirements: Option<Condition>,
    /// Must not hold to start.
    pub forbidders: Option<Condition>,
    /// Starting slots, in slot id order.
    pub slots: Vec<SlotAssignment>,
    /// Slots to fill while a recipe runs.
    pub recipe_slots: BTreeMap<RecipeId, Vec<SlotAssignment>>,
}

impl CompiledRule {
    /// Checks whether the rule may start now.
    pub fn admission(&self, engine: &mut ConditionEngine, ctx: &EvalContext<'_>) -> ConditionResult {
        self.check_admission(engine, ctx)
            .addend(|| format!("rule {} cannot start", self.name))
    }

    fn check_admission(&self, engine: &mut ConditionEngine, ctx: &EvalContext<'_>) -> ConditionResult {
        let state = ctx.snapshot.station_state(&self.station);
        if state != StationState::Idle {
            return ConditionResult::failure(ctx.trace, || FailureReason::StationState {
                station: self.station.clone(),
                detail: format!("expected idle, was {state}"),
            });
        }
        if !ctx.held.is_station_available(&self.station) {
            return ConditionResult::failure(ctx.trace, || FailureReason::StationState {
                station: self.station.clone(),
                detail: "reserved by another execution".to_string(),
            });
        }

        if let Some(requirements) = &self.requirements {
            let key = ConditionKey::RuleRequirements(self.name.clone());
            let result = engine.evaluate(key, requirements, ctx);
            if !result.is_met() {
                return result.addend(|| "requirements not met".to_string());
            }
        }

        if let Some(forbidders) = &self.forbidders {
            if engine
                .evaluate(ConditionKey::RuleForbidders(self.name.clone()), forbidders, ctx)
                .is_met()
            {
                return ConditionResult::failure(ctx.trace, || {
                    FailureReason::message(format!("forbidden by {forbidders}"))
                });
            }
        }

        match self.choose_slots(ctx) {
            Ok(_) => ConditionResult::Success,
            Err(index) => ConditionResult::failure(ctx.trace, || {
                let assignment = &self.slots[index];
                FailureReason::EntityChoice {
                    selector: assignment.selector.to_string(),
                    detail: format!("nothing available for slot {}", assignment.slot),
                }
            }),
        }
    }

    /// Picks a distinct available entity for every starting slot.
    ///
    /// # Errors
    /// Returns the index of the first slot that cannot be filled.
    pub fn choose_slots<'e>(
        &self,
        ctx: &EvalContext<'e>,
    ) -> Result<Vec<(&SlotAssignment, &'e Entity)>, usize> {
        let chosen = consume_match(
            self.slots.iter().map(|s| &s.selector),
            ctx.available_entities(),
            ctx,
        )?;
        Ok(self.slots.iter().zip(chosen).collect())
    }

    /// Slots to fill while the given recipe runs.
    #[must_use]
    pub fn slots_for_recipe(&self, recipe: &RecipeId) -> &[SlotAssignment] {
        self.recipe_slots
            .get(recipe)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

// =============================================================================
// Goals
// =============================================================================

/// Where a goal stands for one snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GoalStatus {
    /// Requirements do not hold.
    Inactive,
    /// Requirements hold and completion does not.
    Active,
    /// Completion holds.
    Complete,
}

/// A validated goal with its rules, sorted by priority.
#[derive(Clone, Debug)]
pub struct Goal {
    /// Goal name.
    pub name: String,
    /// Must hold for the goal to be pursued.
    pub requirements: Option<Condition>,
    /// Goal is complete once this holds. Goals without one never complete.
    pub completion: Option<Condition>,
    /// Rules, highest priority first, declaration order among equals.
    pub rules: Vec<CompiledRule>,
}

impl Goal {
    /// Evaluates the goal's status.
    pub fn status(&self, engine: &mut ConditionEngine, ctx: &EvalContext<'_>) -> GoalStatus {
        if let Some(completion) = &self.completion {
            if engine
                .evaluate(ConditionKey::GoalCompletion(self.name.clone()), completion, ctx)
                .is_met()
            {
                return GoalStatus::Complete;
            }
        }
        if let Some(requirements) = &self.requirements {
            if !engine
                .evaluate(ConditionKey::GoalRequirements(self.name.clone()), requirements, ctx)
                .is_met()
            {
                return GoalStatus::Inactive;
            }
        }
        GoalStatus::Active
    }
}
