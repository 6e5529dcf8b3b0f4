//! Conditions over a game state snapshot.
//!
//! Conditions never fail with an error. They return a [`ConditionResult`],
//! which carries an explanation when the context asks for tracing. Tracing
//! never changes the boolean outcome.

use std::fmt;

use autarch_foundation::{Comparison, Entity, RecipeId, Station, StationId, StationState};

use crate::context::EvalContext;
use crate::result::{CompoundMode, ConditionResult, FailureReason};
use crate::selector::EntitySelector;

/// Anything that can be checked against a snapshot.
pub trait GameStateCondition {
    /// Evaluates the condition.
    fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult;
}

// =============================================================================
// Entity Sets
// =============================================================================

/// A set of selectors that must all be satisfiable at once.
///
/// Matching consumes: once a selector claims an entity, that entity is no
/// longer available to later selectors of the same set.
#[derive(Clone, Debug, Default)]
pub struct EntitySetCondition {
    /// Selectors, matched in order.
    pub selectors: Vec<EntitySelector>,
}

impl EntitySetCondition {
    /// Creates a set from selectors.
    #[must_use]
    pub fn new(selectors: Vec<EntitySelector>) -> Self {
        Self { selectors }
    }

    /// Matches every selector against the pool, consuming as it goes.
    ///
    /// Returns the chosen entities in selector order, or the index of the
    /// first selector that found nothing.
    pub fn match_pool<'e>(
        &self,
        pool: Vec<&'e Entity>,
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<&'e Entity>, usize> {
        consume_match(self.selectors.iter(), pool, ctx)
    }

    /// Evaluates against an explicit pool.
    #[must_use]
    pub fn evaluate_pool(&self, pool: Vec<&Entity>, ctx: &EvalContext<'_>) -> ConditionResult {
        let available = pool.len();
        match self.match_pool(pool, ctx) {
            Ok(_) => ConditionResult::Success,
            Err(index) => ConditionResult::failure(ctx.trace, || FailureReason::EntityChoice {
                selector: self.selectors[index].to_string(),
                detail: format!(
                    "requirement {} of {} unmatched among {available} candidates",
                    index + 1,
                    self.selectors.len()
                ),
            }),
        }
    }
}

impl GameStateCondition for EntitySetCondition {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult {
        self.evaluate_pool(ctx.available_entities(), ctx)
    }
}

/// Matches selectors in order, removing each chosen entity from the pool.
///
/// # Errors
/// Returns the index of the first selector with no candidate.
pub fn consume_match<'s, 'e, I>(
    selectors: I,
    mut pool: Vec<&'e Entity>,
    ctx: &EvalContext<'_>,
) -> Result<Vec<&'e Entity>, usize>
where
    I: IntoIterator<Item = &'s EntitySelector>,
{
    let mut chosen = Vec::new();
    for (index, selector) in selectors.into_iter().enumerate() {
        let Some(entity) = selector.choose(&pool, ctx) else {
            return Err(index);
        };
        pool.retain(|e| e.id != entity.id);
        chosen.push(entity);
    }
    Ok(chosen)
}

// =============================================================================
// Station Conditions
// =============================================================================

/// Requirements on a single station.
#[derive(Clone, Debug)]
pub struct StationCondition {
    /// Station id.
    pub station: StationId,
    /// Required state.
    pub state: Option<StationState>,
    /// Required running recipe.
    pub recipe: Option<RecipeId>,
    /// Required time remaining on the recipe.
    pub time_remaining: Option<Comparison>,
    /// Entity set over stored entities.
    pub stored: Option<EntitySetCondition>,
    /// Entity set over slotted entities.
    pub slotted: Option<EntitySetCondition>,
    /// Entity set over slotted and stored entities.
    pub contents: Option<EntitySetCondition>,
    /// Aggregate aspect requirements over the contents.
    pub contained_aspects: Vec<(String, Comparison)>,
}

impl StationCondition {
    /// Creates a condition with no requirements beyond presence.
    #[must_use]
    pub fn new(station: impl Into<StationId>) -> Self {
        Self {
            station: station.into(),
            state: None,
            recipe: None,
            time_remaining: None,
            stored: None,
            slotted: None,
            contents: None,
            contained_aspects: Vec::new(),
        }
    }

    /// Requires a state.
    #[must_use]
    pub fn in_state(mut self, state: StationState) -> Self {
        self.state = Some(state);
        self
    }

    /// Requires a running recipe.
    #[must_use]
    pub fn running(mut self, recipe: impl Into<RecipeId>) -> Self {
        self.recipe = Some(recipe.into());
        self
    }

    fn fail(&self, ctx: &EvalContext<'_>, detail: impl FnOnce() -> String) -> ConditionResult {
        ConditionResult::failure(ctx.trace, || FailureReason::StationState {
            station: self.station.clone(),
            detail: detail(),
        })
    }

    fn evaluate_present(&self, station: &Station, ctx: &EvalContext<'_>) -> ConditionResult {
        if let Some(required) = self.state {
            if station.state != required {
                return self.fail(ctx, || {
                    format!("expected {required}, was {}", station.state)
                });
            }
        }

        if let Some(recipe) = &self.recipe {
            if station.recipe.as_ref() != Some(recipe) {
                return self.fail(ctx, || match &station.recipe {
                    Some(current) => format!("expected recipe {recipe}, running {current}"),
                    None => format!("expected recipe {recipe}, running nothing"),
                });
            }
        }

        if let Some(time) = &self.time_remaining {
            if !time.matches(f64::from(station.time_remaining)) {
                return self.fail(ctx, || {
                    format!(
                        "time remaining {} does not satisfy {time}",
                        station.time_remaining
                    )
                });
            }
        }

        let sets = [
            ("stored", self.stored.as_ref(), station.stored.iter().collect::<Vec<_>>()),
            ("slotted", self.slotted.as_ref(), station.slotted().collect()),
            ("contents", self.contents.as_ref(), station.contents().collect()),
        ];
        for (label, set, pool) in sets {
            if let Some(set) = set {
                let result = set.evaluate_pool(pool, ctx);
                if !result.is_met() {
                    let station_id = &self.station;
                    return result.addend(|| format!("station {station_id} {label} entities"));
                }
            }
        }

        if !self.contained_aspects.is_empty() {
            let aspects = station.aspects();
            for (name, comparison) in &self.contained_aspects {
                let degree = aspects.degree(name);
                if !comparison.matches(f64::from(degree)) {
                    return self.fail(ctx, || {
                        format!("contained {name} is {degree}, needs {comparison}")
                    });
                }
            }
        }

        ConditionResult::Success
    }
}

impl GameStateCondition for StationCondition {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult {
        match (ctx.snapshot.station(&self.station), self.state) {
            (None, Some(StationState::Missing)) => ConditionResult::Success,
            (None, _) => self.fail(ctx, || "station is missing".to_string()),
            (Some(_), Some(StationState::Missing)) => {
                self.fail(ctx, || "expected missing, but station is present".to_string())
            }
            (Some(station), _) => self.evaluate_present(station, ctx),
        }
    }
}

// =============================================================================
// Memory Conditions
// =============================================================================

/// Compares a memory counter with a threshold. Unset memories read as zero.
#[derive(Clone, Debug)]
pub struct MemoryCondition {
    /// Memory name.
    pub memory: String,
    /// Threshold.
    pub comparison: Comparison,
}

impl GameStateCondition for MemoryCondition {
    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult {
        let value = ctx.snapshot.memory(&self.memory);
        if self.comparison.matches(value as f64) {
            ConditionResult::Success
        } else {
            ConditionResult::failure(ctx.trace, || FailureReason::Memory {
                memory: self.memory.clone(),
                detail: format!("is {value}, needs {}", self.comparison),
            })
        }
    }
}

// =============================================================================
// Condition
// =============================================================================

/// A compiled condition tree.
#[derive(Clone, Debug)]
pub enum Condition {
    /// Every child must hold; stops at the first failure.
    All(Vec<Condition>),
    /// Some child must hold.
    Any(Vec<Condition>),
    /// The child must not hold.
    Not(Box<Condition>),
    /// Entities available on the board.
    EntitySet(EntitySetCondition),
    /// A station's state and contents.
    Station(Box<StationCondition>),
    /// A memory counter.
    Memory(MemoryCondition),
}

impl Condition {
    fn evaluate_all(children: &[Condition], ctx: &EvalContext<'_>) -> ConditionResult {
        for child in children {
            let result = child.evaluate(ctx);
            if !result.is_met() {
                return ConditionResult::failure(ctx.trace, || FailureReason::Compound {
                    mode: CompoundMode::All,
                    failures: result.into_reason().into_iter().collect(),
                });
            }
        }
        ConditionResult::Success
    }

    fn evaluate_any(children: &[Condition], ctx: &EvalContext<'_>) -> ConditionResult {
        let mut failures = Vec::new();
        for child in children {
            let result = child.evaluate(ctx);
            if result.is_met() {
                return ConditionResult::Success;
            }
            if let Some(reason) = result.into_reason() {
                failures.push(reason);
            }
        }
        ConditionResult::failure(ctx.trace, || FailureReason::Compound {
            mode: CompoundMode::Any,
            failures,
        })
    }
}

impl GameStateCondition for Condition {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult {
        match self {
            Self::All(children) => Self::evaluate_all(children, ctx),
            Self::Any(children) => Self::evaluate_any(children, ctx),
            Self::Not(inner) => {
                if inner.evaluate(ctx).is_met() {
                    ConditionResult::failure(ctx.trace, || {
                        FailureReason::message(format!("{inner} holds"))
                    })
                } else {
                    ConditionResult::Success
                }
            }
            Self::EntitySet(set) => set.evaluate(ctx),
            Self::Station(station) => station.evaluate(ctx),
            Self::Memory(memory) => memory.evaluate(ctx),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All(children) => write!(f, "all of {} conditions", children.len()),
            Self::Any(children) => write!(f, "any of {} conditions", children.len()),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::EntitySet(set) => {
                let parts: Vec<String> = set.selectors.iter().map(ToString::to_string).collect();
                write!(f, "entities [{}]", parts.join(", "))
            }
            Self::Station(station) => write!(f, "station {}", station.station),
            Self::Memory(memory) => write!(f, "memory {} {}", memory.memory, memory.comparison),
        }
    }
}

impl From<StationCondition> for Condition {
    fn from(condition: StationCondition) -> Self {
        Self::Station(Box::new(condition))
    }
}

impl From<EntitySetCondition> for Condition {
    fn from(condition: EntitySetCondition) -> Self {
        Self::EntitySet(condition)
    }
}

impl From<MemoryCondition> for Condition {
    fn from(condition: MemoryCondition) -> Self {
        Self::Memory(condition)
    }
}
