//! Condition evaluation with a per-snapshot result cache.
//!
//! Untraced results are memoized by condition key, snapshot version and
//! ledger revision. Traced evaluation always recomputes, so explanations are
//! never served stale and the cache only ever holds bare booleans.

use std::collections::HashMap;

use autarch_foundation::SnapshotVersion;

use crate::condition::GameStateCondition;
use crate::context::EvalContext;
use crate::result::ConditionResult;

// =============================================================================
// Cache
// =============================================================================

/// Identifies a condition across evaluations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConditionKey {
    /// A goal's completion condition.
    GoalCompletion(String),
    /// A goal's requirements.
    GoalRequirements(String),
    /// A rule's requirements.
    RuleRequirements(String),
    /// A rule's forbidders.
    RuleForbidders(String),
    /// Any other condition, keyed by the caller.
    Named(String),
}

impl From<&str> for ConditionKey {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    condition: ConditionKey,
    revision: u64,
}

/// Hit and miss counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that evaluated the condition.
    pub misses: u64,
}

/// Memoized untraced condition results for one snapshot.
#[derive(Debug, Default)]
pub struct ConditionCache {
    version: Option<SnapshotVersion>,
    entries: HashMap<CacheKey, bool>,
    stats: CacheStats,
}

impl ConditionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes the snapshot in use; entries for older snapshots are dropped.
    pub fn observe(&mut self, version: SnapshotVersion) {
        if self.version.is_none_or(|current| version > current) {
            if !self.entries.is_empty() {
                tracing::trace!(
                    dropped = self.entries.len(),
                    %version,
                    "condition cache cleared"
                );
            }
            self.entries.clear();
            self.version = Some(version);
        }
    }

    fn get(&mut self, version: SnapshotVersion, key: &CacheKey) -> Option<bool> {
        if self.version != Some(version) {
            return None;
        }
        let found = self.entries.get(key).copied();
        if found.is_some() {
            self.stats.hits += 1;
        }
        found
    }

    fn insert(&mut self, version: SnapshotVersion, key: CacheKey, met: bool) {
        self.observe(version);
        if self.version == Some(version) {
            self.entries.insert(key, met);
        }
    }

    /// Number of memoized results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counters since creation.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Evaluates conditions, consulting the cache when not tracing.
#[derive(Debug, Default)]
pub struct ConditionEngine {
    cache: ConditionCache,
}

impl ConditionEngine {
    /// Creates an engine with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates a condition under a stable key.
    ///
    /// The key must identify the condition uniquely within the rule set.
    pub fn evaluate<C>(
        &mut self,
        key: ConditionKey,
        condition: &C,
        ctx: &EvalContext<'_>,
    ) -> ConditionResult
    where
        C: GameStateCondition + ?Sized,
    {
        if ctx.trace.is_on() {
            return condition.evaluate(ctx);
        }

        let version = ctx.snapshot.version();
        let cache_key = CacheKey {
            condition: key,
            revision: ctx.held.revision(),
        };
        if let Some(met) = self.cache.get(version, &cache_key) {
            return ConditionResult::from_bool(met);
        }

        self.cache.stats.misses += 1;
        let result = condition.evaluate(ctx);
        self.cache.insert(version, cache_key, result.is_met());
        result
    }

    /// Evaluates without touching the cache.
    #[must_use]
    pub fn evaluate_uncached<C>(condition: &C, ctx: &EvalContext<'_>) -> ConditionResult
    where
        C: GameStateCondition + ?Sized,
    {
        condition.evaluate(ctx)
    }

    /// Notes the snapshot in use, clearing results from older snapshots.
    pub fn observe(&mut self, version: SnapshotVersion) {
        self.cache.observe(version);
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &ConditionCache {
        &self.cache
    }
}
