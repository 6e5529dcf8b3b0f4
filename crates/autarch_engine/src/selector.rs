//! Entity selection.
//!
//! A selector filters a pool of entities and orders the survivors with a
//! fixed, fully deterministic comparator, so identical snapshots always
//! produce identical choices:
//!
//! 1. optional aspect-weight bias (over the selector's own aspect keys if any)
//! 2. optional lifetime bias
//! 3. ascending total aspect weight, unless step 1 already ordered by it
//! 4. ascending lifetime, unless step 2 applied
//! 5. ascending signature

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use autarch_foundation::{Comparison, ElementId, Entity, EntityId, EntityLocation};
use serde::Deserialize;

use crate::condition::{Condition, GameStateCondition};
use crate::context::EvalContext;

// =============================================================================
// Options
// =============================================================================

/// Preference by aspect weight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBias {
    /// Prefer the lightest entity.
    Lowest,
    /// Prefer the heaviest entity.
    Highest,
}

/// Preference by remaining lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeBias {
    /// Least lifetime remaining first.
    Oldest,
    /// Most lifetime remaining first.
    Youngest,
}

/// Which elements a selector accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementMatch {
    /// Exactly this element.
    Exact(ElementId),
    /// Any element of the list.
    AnyOf(Vec<ElementId>),
}

impl ElementMatch {
    fn matches(&self, element: &ElementId) -> bool {
        match self {
            Self::Exact(id) => id == element,
            Self::AnyOf(ids) => ids.contains(element),
        }
    }
}

// =============================================================================
// Selector Spec
// =============================================================================

/// A single filtering and ordering specification.
#[derive(Clone, Debug, Default)]
pub struct SelectorSpec {
    /// Element identity filter.
    pub element: Option<ElementMatch>,
    /// Elements that are never chosen.
    pub forbidden_elements: Vec<ElementId>,
    /// Accepted locations; empty accepts every location.
    pub locations: Vec<EntityLocation>,
    /// Remaining lifetime filter.
    pub lifetime: Option<Comparison>,
    /// Minimum degree per aspect, sorted by name.
    pub aspects: Vec<(String, u32)>,
    /// Any of these aspects disqualifies an entity.
    pub forbidden_aspects: Vec<String>,
    /// Required uniqueness flag.
    pub unique: Option<bool>,
    /// Candidates must also be in this selector's output set.
    pub from: Option<Box<EntitySelector>>,
    /// Weight ordering preference.
    pub weight_bias: Option<WeightBias>,
    /// Lifetime ordering preference.
    pub lifetime_bias: Option<LifetimeBias>,
}

impl SelectorSpec {
    /// Creates a spec that accepts one element.
    #[must_use]
    pub fn element(element: impl Into<ElementId>) -> Self {
        Self {
            element: Some(ElementMatch::Exact(element.into())),
            ..Self::default()
        }
    }

    /// Adds a minimum aspect degree.
    #[must_use]
    pub fn with_aspect(mut self, name: impl Into<String>, degree: u32) -> Self {
        let name = name.into();
        self.aspects.retain(|(n, _)| *n != name);
        self.aspects.push((name, degree));
        self.aspects.sort();
        self
    }

    /// Adds a forbidden aspect.
    #[must_use]
    pub fn without_aspect(mut self, name: impl Into<String>) -> Self {
        self.forbidden_aspects.push(name.into());
        self
    }

    /// Restricts accepted locations.
    #[must_use]
    pub fn at(mut self, location: EntityLocation) -> Self {
        self.locations.push(location);
        self
    }

    /// Sets the lifetime filter.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Comparison) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Sets the weight bias.
    #[must_use]
    pub fn with_weight_bias(mut self, bias: WeightBias) -> Self {
        self.weight_bias = Some(bias);
        self
    }

    /// Sets the lifetime bias.
    #[must_use]
    pub fn with_lifetime_bias(mut self, bias: LifetimeBias) -> Self {
        self.lifetime_bias = Some(bias);
        self
    }

    /// Wraps the spec into a selector.
    #[must_use]
    pub fn into_selector(self) -> EntitySelector {
        EntitySelector::Spec(Box::new(self))
    }

    /// Tests every per-entity predicate except the derived `from` filter.
    #[must_use]
    pub fn accepts(&self, entity: &Entity) -> bool {
        if let Some(element) = &self.element {
            if !element.matches(&entity.element) {
                return false;
            }
        }
        if self.forbidden_elements.contains(&entity.element) {
            return false;
        }
        if !self.locations.is_empty() && !self.locations.contains(&entity.location) {
            return false;
        }
        if let Some(lifetime) = &self.lifetime {
            if !lifetime.matches(f64::from(entity.lifetime)) {
                return false;
            }
        }
        if self
            .aspects
            .iter()
            .any(|(name, min)| entity.aspects.degree(name) < *min)
        {
            return false;
        }
        if self
            .forbidden_aspects
            .iter()
            .any(|name| entity.aspects.contains(name))
        {
            return false;
        }
        if let Some(unique) = self.unique {
            if entity.unique != unique {
                return false;
            }
        }
        true
    }

    /// Filters and orders the pool.
    fn candidates<'e>(&self, pool: &[&'e Entity], ctx: &EvalContext<'_>) -> Vec<&'e Entity> {
        let derived: Option<HashSet<EntityId>> = self
            .from
            .as_ref()
            .map(|from| from.candidates(pool, ctx).iter().map(|e| e.id).collect());

        let mut found: Vec<&'e Entity> = pool
            .iter()
            .copied()
            .filter(|e| self.accepts(e))
            .filter(|e| derived.as_ref().is_none_or(|ids| ids.contains(&e.id)))
            .collect();

        if found.len() > 1 {
            found.sort_by(|a, b| self.compare(a, b));
        }
        found
    }

    fn weight(&self, entity: &Entity) -> u64 {
        if self.aspects.is_empty() {
            entity.aspects.total_weight()
        } else {
            entity
                .aspects
                .weight_of(self.aspects.iter().map(|(name, _)| name.as_str()))
        }
    }

    /// The composite ordering; `Less` means `a` is preferred.
    #[must_use]
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        let biased = match self.weight_bias {
            Some(WeightBias::Lowest) => self.weight(a).cmp(&self.weight(b)),
            Some(WeightBias::Highest) => self.weight(b).cmp(&self.weight(a)),
            None => Ordering::Equal,
        };
        // Only an unkeyed bias orders by total weight; a keyed bias leaves
        // entities that tie on their keyed aspects to the total-weight step.
        let bias_covered_total = self.weight_bias.is_some() && self.aspects.is_empty();

        biased
            .then_with(|| match self.lifetime_bias {
                Some(LifetimeBias::Oldest) => a.lifetime.total_cmp(&b.lifetime),
                Some(LifetimeBias::Youngest) => b.lifetime.total_cmp(&a.lifetime),
                None => Ordering::Equal,
            })
            .then_with(|| {
                if bias_covered_total {
                    Ordering::Equal
                } else {
                    a.aspects.total_weight().cmp(&b.aspects.total_weight())
                }
            })
            .then_with(|| {
                if self.lifetime_bias.is_some() {
                    Ordering::Equal
                } else {
                    a.lifetime.total_cmp(&b.lifetime)
                }
            })
            .then_with(|| a.signature.cmp(&b.signature))
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(ElementMatch::Exact(id)) => write!(f, "{id}")?,
            Some(ElementMatch::AnyOf(ids)) => {
                let names: Vec<&str> = ids.iter().map(ElementId::as_str).collect();
                write!(f, "one of [{}]", names.join(", "))?;
            }
            None => f.write_str("any")?,
        }
        if !self.aspects.is_empty() {
            let parts: Vec<String> = self
                .aspects
                .iter()
                .map(|(name, min)| format!("{name}>={min}"))
                .collect();
            write!(f, "{{{}}}", parts.join(", "))?;
        }
        if !self.forbidden_aspects.is_empty() {
            write!(f, " without [{}]", self.forbidden_aspects.join(", "))?;
        }
        if let Some(lifetime) = &self.lifetime {
            write!(f, " lifetime {lifetime}")?;
        }
        if let Some(from) = &self.from {
            write!(f, " from ({from})")?;
        }
        Ok(())
    }
}

// =============================================================================
// Entity Selector
// =============================================================================

/// Picks the best entity for a requirement.
#[derive(Clone, Debug)]
pub enum EntitySelector {
    /// Filter and order.
    Spec(Box<SelectorSpec>),
    /// The first child with a non-empty result wins.
    FirstOf(Vec<EntitySelector>),
    /// Yields nothing unless the condition holds.
    Gated {
        /// Gate.
        condition: Box<Condition>,
        /// Selector used when the gate is open.
        selector: Box<EntitySelector>,
    },
}

impl EntitySelector {
    /// Every acceptable entity of the pool, best first.
    #[must_use]
    pub fn candidates<'e>(&self, pool: &[&'e Entity], ctx: &EvalContext<'_>) -> Vec<&'e Entity> {
        match self {
            Self::Spec(spec) => spec.candidates(pool, ctx),
            Self::FirstOf(selectors) => selectors
                .iter()
                .map(|s| s.candidates(pool, ctx))
                .find(|found| !found.is_empty())
                .unwrap_or_default(),
            Self::Gated {
                condition,
                selector,
            } => {
                if condition.evaluate(ctx).is_met() {
                    selector.candidates(pool, ctx)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// The best acceptable entity of the pool.
    #[must_use]
    pub fn choose<'e>(&self, pool: &[&'e Entity], ctx: &EvalContext<'_>) -> Option<&'e Entity> {
        self.candidates(pool, ctx).into_iter().next()
    }

    /// The best acceptable entity among the entities no constraint holds.
    #[must_use]
    pub fn choose_available<'e>(&self, ctx: &EvalContext<'e>) -> Option<&'e Entity> {
        let pool = ctx.available_entities();
        self.choose(&pool, ctx)
    }
}

impl fmt::Display for EntitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spec(spec) => write!(f, "{spec}"),
            Self::FirstOf(selectors) => {
                let parts: Vec<String> = selectors.iter().map(ToString::to_string).collect();
                write!(f, "first of [{}]", parts.join(" | "))
            }
            Self::Gated { selector, .. } => write!(f, "{selector} (gated)"),
        }
    }
}

impl From<SelectorSpec> for EntitySelector {
    fn from(spec: SelectorSpec) -> Self {
        spec.into_selector()
    }
}
