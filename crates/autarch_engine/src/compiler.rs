//! Compiles declarations into engine types.
//!
//! Validation happens here and only here. A rule that fails to compile is
//! never registered.

use std::collections::{BTreeMap, HashSet};

use autarch_foundation::{
    Comparison, ElementId, EntityLocation, Error, ErrorContext, RecipeId, Result, StationId,
    StationState,
};

use crate::condition::{Condition, EntitySetCondition, MemoryCondition, StationCondition};
use crate::declaration::{
    ConditionDecl, GoalDecl, LocationDecl, RuleDecl, RuleSetDecl, SelectorDecl,
    StationConditionDecl, StationStateDecl,
};
use crate::rule::{CompiledRule, Goal, SlotAssignment};
use crate::selector::{ElementMatch, EntitySelector, SelectorSpec};

/// Where a selector is used, which decides its default locations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectorScope {
    /// Chooses from the whole board; defaults to entities on the table.
    Board,
    /// Chooses from a station's contents; defaults to every location.
    Station,
}

/// Compiles and validates declarations.
pub struct DeclarationCompiler;

impl DeclarationCompiler {
    /// Compiles a rule set into goals.
    ///
    /// # Errors
    /// Returns a configuration error for the first invalid goal or rule, or
    /// when two rules share a name.
    pub fn compile_rule_set(decl: &RuleSetDecl) -> Result<Vec<Goal>> {
        let mut seen = HashSet::new();
        for rule in decl.goals.iter().flat_map(|g| &g.rules) {
            if !seen.insert(rule.name.as_str()) {
                return Err(Error::configuration(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
        }
        decl.goals.iter().map(Self::compile_goal).collect()
    }

    /// Compiles a goal and its rules.
    ///
    /// # Errors
    /// Returns a configuration error if the goal or any rule is invalid.
    pub fn compile_goal(decl: &GoalDecl) -> Result<Goal> {
        let context = || ErrorContext::new().with_frame(format!("goal {}", decl.name));
        if decl.name.trim().is_empty() {
            return Err(Error::configuration("goal name is empty"));
        }

        let requirements = decl
            .requirements
            .as_ref()
            .map(Self::compile_condition)
            .transpose()
            .map_err(|e| e.with_context(context()))?;
        let completion = decl
            .completion
            .as_ref()
            .map(Self::compile_condition)
            .transpose()
            .map_err(|e| e.with_context(context()))?;

        let mut rules = decl
            .rules
            .iter()
            .map(|rule| Self::compile_rule(rule, &decl.name))
            .collect::<Result<Vec<_>>>()?;
        // Stable: declaration order among equal priorities.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        Ok(Goal {
            name: decl.name.clone(),
            requirements,
            completion,
            rules,
        })
    }

    /// Compiles a rule.
    ///
    /// # Errors
    /// Returns a configuration error if the rule has no station, no slots, or
    /// any invalid condition or selector.
    pub fn compile_rule(decl: &RuleDecl, goal: &str) -> Result<CompiledRule> {
        Self::compile_rule_inner(decl, goal).map_err(|e| {
            e.with_context(
                ErrorContext::new()
                    .with_rule(decl.name.clone())
                    .with_frame(format!("goal {goal}")),
            )
        })
    }

    fn compile_rule_inner(decl: &RuleDecl, goal: &str) -> Result<CompiledRule> {
        if decl.name.trim().is_empty() {
            return Err(Error::configuration("rule name is empty"));
        }
        let station = match decl.station.as_deref() {
            Some(id) if !id.trim().is_empty() => StationId::new(id),
            _ => return Err(Error::configuration("rule has no station")),
        };
        if decl.slots.is_empty() {
            return Err(Error::configuration("rule has no starting slots"));
        }

        let requirements = decl
            .requirements
            .as_ref()
            .map(Self::compile_condition)
            .transpose()?;
        let forbidders = decl
            .forbidders
            .as_ref()
            .map(Self::compile_condition)
            .transpose()?;
        let slots = Self::compile_slots(&decl.slots)?;

        let mut recipe_slots = BTreeMap::new();
        for (recipe, slots) in &decl.recipes {
            recipe_slots.insert(RecipeId::new(recipe), Self::compile_slots(slots)?);
        }

        Ok(CompiledRule {
            name: decl.name.clone(),
            goal: goal.to_string(),
            priority: decl.priority,
            station,
            requirements,
            forbidders,
            slots,
            recipe_slots,
        })
    }

    fn compile_slots(slots: &BTreeMap<String, SelectorDecl>) -> Result<Vec<SlotAssignment>> {
        slots
            .iter()
            .map(|(slot, decl)| {
                Ok(SlotAssignment {
                    slot: slot.clone(),
                    selector: Self::compile_selector(decl, SelectorScope::Board)
                        .map_err(|e| e.with_context(ErrorContext::new().with_frame(format!("slot {slot}"))))?,
                })
            })
            .collect()
    }

    /// Compiles a condition tree.
    ///
    /// # Errors
    /// Returns a configuration error for malformed nodes.
    pub fn compile_condition(decl: &ConditionDecl) -> Result<Condition> {
        match decl {
            ConditionDecl::All { conditions } => Ok(Condition::All(Self::compile_children(conditions, "all")?)),
            ConditionDecl::Any { conditions } => Ok(Condition::Any(Self::compile_children(conditions, "any")?)),
            ConditionDecl::Not { condition } => {
                Ok(Condition::Not(Box::new(Self::compile_condition(condition)?)))
            }
            ConditionDecl::Entities { choose } => Ok(Condition::EntitySet(Self::compile_entity_set(
                choose,
                SelectorScope::Board,
            )?)),
            ConditionDecl::Station(station) => Ok(Self::compile_station(station)?.into()),
            ConditionDecl::Memory { memory, compare } => {
                if memory.trim().is_empty() {
                    return Err(Error::configuration("memory condition has no memory name"));
                }
                Ok(Condition::Memory(MemoryCondition {
                    memory: memory.clone(),
                    comparison: compare.parse()?,
                }))
            }
        }
    }

    fn compile_children(children: &[ConditionDecl], kind: &str) -> Result<Vec<Condition>> {
        if children.is_empty() {
            return Err(Error::configuration(format!("'{kind}' condition has no children")));
        }
        children.iter().map(Self::compile_condition).collect()
    }

    fn compile_entity_set(choose: &[SelectorDecl], scope: SelectorScope) -> Result<EntitySetCondition> {
        if choose.is_empty() {
            return Err(Error::configuration("entity set has no selectors"));
        }
        let selectors = choose
            .iter()
            .map(|decl| Self::compile_selector(decl, scope))
            .collect::<Result<Vec<_>>>()?;
        Ok(EntitySetCondition::new(selectors))
    }

    fn compile_station(decl: &StationConditionDecl) -> Result<StationCondition> {
        let Some(id) = decl.station.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Err(Error::configuration("station condition has no station id"));
        };

        let mut condition = StationCondition::new(id);
        condition.state = decl.state.map(|state| match state {
            StationStateDecl::Missing => StationState::Missing,
            StationStateDecl::Idle => StationState::Idle,
            StationStateDecl::Occupied => StationState::Occupied,
        });
        condition.recipe = decl.recipe.as_deref().map(RecipeId::new);
        condition.time_remaining = decl
            .time_remaining
            .as_deref()
            .map(str::parse::<Comparison>)
            .transpose()?;

        let set = |selectors: &Option<Vec<SelectorDecl>>| {
            selectors
                .as_deref()
                .map(|choose| Self::compile_entity_set(choose, SelectorScope::Station))
                .transpose()
        };
        condition.stored = set(&decl.stored)?;
        condition.slotted = set(&decl.slotted)?;
        condition.contents = set(&decl.contents)?;

        condition.contained_aspects = decl
            .contained_aspects
            .iter()
            .map(|(name, compare)| Ok((name.clone(), compare.parse::<Comparison>()?)))
            .collect::<Result<Vec<_>>>()?;

        if condition.state == Some(StationState::Missing)
            && (condition.recipe.is_some()
                || condition.time_remaining.is_some()
                || condition.stored.is_some()
                || condition.slotted.is_some()
                || condition.contents.is_some()
                || !condition.contained_aspects.is_empty())
        {
            return Err(Error::configuration(format!(
                "station condition on '{id}' requires the station to be missing and also inspects it"
            )));
        }
        Ok(condition)
    }

    /// Compiles a selector.
    ///
    /// # Errors
    /// Returns a configuration error for contradictory options or comparisons
    /// that do not parse.
    pub fn compile_selector(decl: &SelectorDecl, scope: SelectorScope) -> Result<EntitySelector> {
        let selector = if decl.first_of.is_empty() {
            EntitySelector::Spec(Box::new(Self::compile_spec(decl, scope)?))
        } else {
            if decl.has_filters() {
                return Err(Error::configuration(
                    "selector sets both 'first_of' and filter options",
                ));
            }
            let alternatives = decl
                .first_of
                .iter()
                .map(|alt| Self::compile_selector(alt, scope))
                .collect::<Result<Vec<_>>>()?;
            EntitySelector::FirstOf(alternatives)
        };

        match &decl.when {
            Some(gate) => Ok(EntitySelector::Gated {
                condition: Box::new(Self::compile_condition(gate)?),
                selector: Box::new(selector),
            }),
            None => Ok(selector),
        }
    }

    fn compile_spec(decl: &SelectorDecl, scope: SelectorScope) -> Result<SelectorSpec> {
        let element = match (&decl.element, &decl.elements) {
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    "selector sets both 'element' and 'elements'",
                ));
            }
            (Some(one), None) => Some(ElementMatch::Exact(ElementId::new(one))),
            (None, Some(many)) if many.is_empty() => {
                return Err(Error::configuration("selector 'elements' is empty"));
            }
            (None, Some(many)) => Some(ElementMatch::AnyOf(
                many.iter().map(ElementId::new).collect(),
            )),
            (None, None) => None,
        };

        let forbidden_elements: Vec<ElementId> =
            decl.forbidden_elements.iter().map(ElementId::new).collect();
        if let Some(ElementMatch::Exact(id)) = &element {
            if forbidden_elements.contains(id) {
                return Err(Error::configuration(format!(
                    "selector requires and forbids element '{id}'"
                )));
            }
        }

        if let Some(name) = decl
            .forbidden_aspects
            .iter()
            .find(|name| decl.aspects.contains_key(name.as_str()))
        {
            return Err(Error::configuration(format!(
                "selector requires and forbids aspect '{name}'"
            )));
        }

        let locations = if decl.locations.contains(&LocationDecl::Any) {
            if decl.locations.len() > 1 {
                return Err(Error::configuration(
                    "selector location 'any' cannot be combined with other locations",
                ));
            }
            Vec::new()
        } else if decl.locations.is_empty() {
            match scope {
                SelectorScope::Board => vec![EntityLocation::Table],
                SelectorScope::Station => Vec::new(),
            }
        } else {
            decl.locations.iter().filter_map(|l| location(*l)).collect()
        };

        let from = decl
            .from
            .as_deref()
            .map(|inner| Self::compile_selector(inner, scope))
            .transpose()?
            .map(Box::new);

        Ok(SelectorSpec {
            element,
            forbidden_elements,
            locations,
            lifetime: decl.lifetime.as_deref().map(str::parse).transpose()?,
            aspects: decl
                .aspects
                .iter()
                .map(|(name, degree)| (name.clone(), *degree))
                .collect(),
            forbidden_aspects: decl.forbidden_aspects.clone(),
            unique: decl.unique,
            from,
            weight_bias: decl.weight_bias,
            lifetime_bias: decl.lifetime_bias,
        })
    }
}

fn location(decl: LocationDecl) -> Option<EntityLocation> {
    match decl {
        LocationDecl::Any => None,
        LocationDecl::Table => Some(EntityLocation::Table),
        LocationDecl::InTransit => Some(EntityLocation::InTransit),
        LocationDecl::Slotted => Some(EntityLocation::Slotted),
        LocationDecl::Stored => Some(EntityLocation::Stored),
        LocationDecl::Portal => Some(EntityLocation::Portal),
    }
}
