//! Exclusive resource reservation.
//!
//! A [`ResourceLedger`] holds consumer-owned constraints, each listing the
//! resources it would accept in preference order. The assignment is never
//! stored: every query recomputes it from scratch with a greedy pass.
//!
//! # Assignment
//!
//! 1. Collect each constraint's candidates for the snapshot.
//! 2. Weight each candidate by how many constraints accept it.
//! 3. Visit constraints by priority (highest first), then registration order.
//! 4. Each takes its least-contested free candidate; equal weights keep the
//!    constraint's own preference order.
//!
//! A new constraint is accepted only if one of its candidates is not held
//! right now and every constraint that was satisfied stays satisfied.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use autarch_foundation::{EntityId, Error, GameStateSnapshot, Result, StationId};

use crate::context::{EvalContext, HeldResources};
use crate::selector::EntitySelector;

// =============================================================================
// Constraints
// =============================================================================

/// A consumer's claim on one resource of type `T`.
pub trait ResourceConstraint<T> {
    /// Acceptable resources for this snapshot, most preferred first.
    fn candidates(&self, snapshot: &GameStateSnapshot) -> Vec<T>;

    /// Higher priorities are assigned first.
    fn priority(&self) -> i32 {
        0
    }

    /// Disposed constraints are pruned before every ledger operation.
    fn is_disposed(&self) -> bool {
        false
    }

    /// Short description for logs.
    fn label(&self) -> &str;
}

/// Shared flag a consumer flips to release its constraint.
#[derive(Clone, Debug, Default)]
pub struct DisposalFlag(Rc<Cell<bool>>);

impl DisposalFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the constraint as disposed.
    pub fn dispose(&self) {
        self.0.set(true);
    }

    /// Returns true once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.get()
    }
}

/// A constraint with a fixed candidate list.
#[derive(Clone, Debug)]
pub struct FixedConstraint<T> {
    label: String,
    candidates: Vec<T>,
    priority: i32,
    disposal: DisposalFlag,
}

impl<T: Clone> FixedConstraint<T> {
    /// Creates a constraint accepting the given resources in order.
    #[must_use]
    pub fn new(label: impl Into<String>, candidates: Vec<T>) -> Self {
        Self {
            label: label.into(),
            candidates,
            priority: 0,
            disposal: DisposalFlag::new(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Shares a disposal flag with the caller.
    #[must_use]
    pub fn with_disposal(mut self, disposal: DisposalFlag) -> Self {
        self.disposal = disposal;
        self
    }
}

impl<T: Clone> ResourceConstraint<T> for FixedConstraint<T> {
    fn candidates(&self, _snapshot: &GameStateSnapshot) -> Vec<T> {
        self.candidates.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_disposed(&self) -> bool {
        self.disposal.is_disposed()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// An entity constraint whose candidates are a selector's ordered output.
///
/// Candidates are computed against the whole snapshot, ignoring what the
/// ledger currently holds; the ledger itself resolves contention.
#[derive(Clone, Debug)]
pub struct SelectorConstraint {
    label: String,
    selector: EntitySelector,
    priority: i32,
    disposal: DisposalFlag,
}

impl SelectorConstraint {
    /// Creates a constraint from a selector.
    #[must_use]
    pub fn new(label: impl Into<String>, selector: EntitySelector) -> Self {
        Self {
            label: label.into(),
            selector,
            priority: 0,
            disposal: DisposalFlag::new(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Shares a disposal flag with the caller.
    #[must_use]
    pub fn with_disposal(mut self, disposal: DisposalFlag) -> Self {
        self.disposal = disposal;
        self
    }
}

impl ResourceConstraint<EntityId> for SelectorConstraint {
    fn candidates(&self, snapshot: &GameStateSnapshot) -> Vec<EntityId> {
        let held = HeldResources::none();
        let ctx = EvalContext::new(snapshot, &held);
        let pool: Vec<_> = snapshot.entities().collect();
        self.selector
            .candidates(&pool, &ctx)
            .into_iter()
            .map(|e| e.id)
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_disposed(&self) -> bool {
        self.disposal.is_disposed()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Identifies a registered constraint within one ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Registration<T> {
    id: ConstraintId,
    constraint: Box<dyn ResourceConstraint<T>>,
}

/// Exclusive reservations of `T` against competing constraints.
pub struct ResourceLedger<T> {
    registrations: Vec<Registration<T>>,
    next_id: u64,
    revision: u64,
}

impl<T> Default for ResourceLedger<T> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 0,
            revision: 0,
        }
    }
}

impl<T> fmt::Debug for ResourceLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self
            .registrations
            .iter()
            .map(|r| r.constraint.label())
            .collect();
        f.debug_struct("ResourceLedger")
            .field("constraints", &labels)
            .field("revision", &self.revision)
            .finish()
    }
}

impl<T> ResourceLedger<T>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Bumped on every registration change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Removes disposed constraints. Returns how many were removed.
    pub fn prune_disposed(&mut self) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| !r.constraint.is_disposed());
        let removed = before - self.registrations.len();
        if removed > 0 {
            self.revision += 1;
            tracing::debug!(removed, revision = self.revision, "pruned disposed constraints");
        }
        removed
    }

    /// Registers a constraint, failing if it cannot coexist with the others.
    ///
    /// # Errors
    /// Returns `ReservationConflict` when the constraint would go unsatisfied
    /// or would leave a currently satisfied constraint without a resource.
    pub fn add_constraint(
        &mut self,
        constraint: Box<dyn ResourceConstraint<T>>,
        snapshot: &GameStateSnapshot,
    ) -> Result<ConstraintId> {
        let label = constraint.label().to_string();
        self.try_add_constraint(constraint, snapshot).ok_or_else(|| {
            Error::reservation_conflict(format!("constraint '{label}' cannot be satisfied"))
        })
    }

    /// Registers a constraint if one of its candidates is free and every
    /// satisfied constraint stays satisfied.
    pub fn try_add_constraint(
        &mut self,
        constraint: Box<dyn ResourceConstraint<T>>,
        snapshot: &GameStateSnapshot,
    ) -> Option<ConstraintId> {
        if self.resolve_hypothetical(constraint.as_ref(), snapshot).is_none() {
            tracing::warn!(
                constraint = constraint.label(),
                "reservation rejected: every candidate is held"
            );
            return None;
        }

        let before = self.solve(None, snapshot);
        let after = self.solve(Some(constraint.as_ref()), snapshot);

        let newcomer_satisfied = after.last().is_some_and(Option::is_some);
        let others_kept = before
            .iter()
            .zip(&after)
            .all(|(was, is)| was.is_none() || is.is_some());

        if !(newcomer_satisfied && others_kept) {
            tracing::warn!(
                constraint = constraint.label(),
                newcomer_satisfied,
                others_kept,
                "reservation rejected"
            );
            return None;
        }

        let id = ConstraintId(self.next_id);
        self.next_id += 1;
        self.revision += 1;
        tracing::debug!(constraint = constraint.label(), %id, "reservation added");
        self.registrations.push(Registration { id, constraint });
        Some(id)
    }

    /// Unregisters a constraint. Returns false if it was not registered.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        let removed = self.registrations.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// The resource currently assigned to a constraint.
    pub fn resolve(&mut self, id: ConstraintId, snapshot: &GameStateSnapshot) -> Option<T> {
        self.prune_disposed();
        let index = self.registrations.iter().position(|r| r.id == id)?;
        self.solve(None, snapshot).swap_remove(index)
    }

    /// The first candidate of an unregistered constraint that no registered
    /// constraint currently holds. Registered assignments are left as they are.
    pub fn resolve_hypothetical(
        &mut self,
        constraint: &dyn ResourceConstraint<T>,
        snapshot: &GameStateSnapshot,
    ) -> Option<T> {
        self.prune_disposed();
        let held: HashSet<T> = self.solve(None, snapshot).into_iter().flatten().collect();
        dedup(constraint.candidates(snapshot))
            .into_iter()
            .find(|candidate| !held.contains(candidate))
    }

    /// Returns true if no constraint is assigned the resource.
    pub fn is_available(&mut self, resource: &T, snapshot: &GameStateSnapshot) -> bool {
        self.prune_disposed();
        !self
            .solve(None, snapshot)
            .iter()
            .any(|assigned| assigned.as_ref() == Some(resource))
    }

    /// Every satisfied constraint with its resource, in registration order.
    pub fn assignments(&mut self, snapshot: &GameStateSnapshot) -> Vec<(ConstraintId, T)> {
        self.prune_disposed();
        self.registrations
            .iter()
            .zip(self.solve(None, snapshot))
            .filter_map(|(r, assigned)| assigned.map(|t| (r.id, t)))
            .collect()
    }

    /// Runs the greedy assignment over every registration plus an optional
    /// extra constraint appended last. Output is aligned with that order.
    fn solve(
        &self,
        extra: Option<&dyn ResourceConstraint<T>>,
        snapshot: &GameStateSnapshot,
    ) -> Vec<Option<T>> {
        let mut constraints: Vec<&dyn ResourceConstraint<T>> = self
            .registrations
            .iter()
            .map(|r| r.constraint.as_ref())
            .collect();
        constraints.extend(extra);

        let lists: Vec<Vec<T>> = constraints
            .iter()
            .map(|c| dedup(c.candidates(snapshot)))
            .collect();

        let mut weights: HashMap<&T, usize> = HashMap::new();
        for candidate in lists.iter().flatten() {
            *weights.entry(candidate).or_default() += 1;
        }

        let mut order: Vec<usize> = (0..constraints.len()).collect();
        order.sort_by(|&a, &b| {
            constraints[b]
                .priority()
                .cmp(&constraints[a].priority())
                .then(a.cmp(&b))
        });

        let mut taken: HashSet<&T> = HashSet::new();
        let mut assigned = vec![None; constraints.len()];
        for index in order {
            let best = lists[index]
                .iter()
                .enumerate()
                .filter(|(_, candidate)| !taken.contains(candidate))
                .min_by_key(|(preference, candidate)| (weights[candidate], *preference))
                .map(|(_, candidate)| candidate);
            if let Some(candidate) = best {
                taken.insert(candidate);
                assigned[index] = Some(candidate.clone());
            }
        }
        assigned
    }
}

fn dedup<T: Eq + Hash + Clone>(candidates: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

// =============================================================================
// Reservations
// =============================================================================

/// The entity and station ledgers together.
#[derive(Debug, Default)]
pub struct Reservations {
    /// Entity reservations.
    pub entities: ResourceLedger<EntityId>,
    /// Station reservations.
    pub stations: ResourceLedger<StationId>,
}

impl Reservations {
    /// Creates empty ledgers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prunes both ledgers. Returns how many constraints were removed.
    pub fn prune_disposed(&mut self) -> usize {
        self.entities.prune_disposed() + self.stations.prune_disposed()
    }

    /// Combined revision of both ledgers; increases on any change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.entities.revision() + self.stations.revision()
    }

    /// What both ledgers currently hold for this snapshot.
    pub fn held(&mut self, snapshot: &GameStateSnapshot) -> HeldResources {
        self.prune_disposed();
        let entities = self
            .entities
            .assignments(snapshot)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let stations = self
            .stations
            .assignments(snapshot)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        HeldResources::new(entities, stations, self.revision())
    }
}
