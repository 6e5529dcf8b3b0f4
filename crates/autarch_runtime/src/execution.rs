//! Rule executions.
//!
//! A [`RuleExecution`] drives one admitted rule through its station:
//!
//! ```text
//! Starting ──start sequence done──▶ Ongoing ──station idle──▶ Collecting ──▶ Done
//!     │                               │ fills recipe slots          │
//!     └──────── fault / cancel / abort ┴─────────────────────────────┴──▶ Done
//! ```
//!
//! Every reservation an execution makes carries one of its disposal flags.
//! Reaching `Done` by any path disposes them, so the ledgers drop the
//! execution's constraints at their next prune.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use autarch_engine::{CompiledRule, DisposalFlag, EvalContext, FixedConstraint, Reservations};
use autarch_foundation::{Entity, EntityId, Error, RecipeId, Result, Station, StationState};
use autarch_scheduler::{
    ActionActor, ActionList, ActionSequence, PendingActionSequence, Recovering, TaskOutcome,
};

use crate::actions::Action;

// =============================================================================
// Phases and Outcomes
// =============================================================================

/// Where an execution stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionPhase {
    /// Slotting the starting entities and starting the station.
    Starting,
    /// The station is working; recipe slots are filled as they open.
    Ongoing,
    /// Collecting the station's output.
    Collecting,
    /// Finished; all reservations released.
    Done,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Ongoing => f.write_str("ongoing"),
            Self::Collecting => f.write_str("collecting"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// How an execution ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The station ran and its output, if any, was collected.
    Completed,
    /// Something went wrong; the station may have been closed.
    Failed(String),
    /// Cancelled by the host.
    Cancelled,
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

/// One admitted rule running on its station.
#[derive(Debug)]
pub struct RuleExecution {
    rule: Rc<CompiledRule>,
    phase: ExecutionPhase,
    started_at: u64,
    station_flag: DisposalFlag,
    entity_flags: Vec<DisposalFlag>,
    pending: Option<PendingActionSequence>,
    filled: BTreeSet<(RecipeId, String)>,
    cancel_requested: bool,
    outcome: Option<ExecutionOutcome>,
}

impl RuleExecution {
    /// Reserves the station and one entity per starting slot, then queues the
    /// start sequence on the actor.
    ///
    /// The rule should already have been admitted against `ctx`.
    ///
    /// # Errors
    /// Returns `ReservationConflict` if a slot cannot be filled or a
    /// reservation is rejected. Nothing stays reserved on error.
    pub fn start(
        rule: Rc<CompiledRule>,
        ctx: &EvalContext<'_>,
        reservations: &mut Reservations,
        actor: &mut ActionActor<Action>,
    ) -> Result<Self> {
        let chosen = rule.choose_slots(ctx).map_err(|index| {
            Error::reservation_conflict(format!(
                "rule {}: nothing available for slot {}",
                rule.name, rule.slots[index].slot
            ))
        })?;
        let slots: Vec<(String, EntityId)> = chosen
            .into_iter()
            .map(|(assignment, entity)| (assignment.slot.clone(), entity.id))
            .collect();

        let mut execution = Self {
            rule: Rc::clone(&rule),
            phase: ExecutionPhase::Starting,
            started_at: ctx.snapshot.tick(),
            station_flag: DisposalFlag::new(),
            entity_flags: Vec::new(),
            pending: None,
            filled: BTreeSet::new(),
            cancel_requested: false,
            outcome: None,
        };

        if let Err(error) = execution.reserve(ctx, &slots, reservations) {
            execution.release();
            return Err(error);
        }

        let station = rule.station.clone();
        let sequence = Recovering::new(
            Action::start_sequence(&rule.station, slots),
            move |error: &Error| {
                tracing::info!(%station, %error, "closing station after failed start");
                Ok(Box::new(ActionList::new([Action::Close {
                    station: station.clone(),
                }])) as Box<dyn ActionSequence<Action>>)
            },
        );
        execution.pending = Some(actor.enqueue(sequence));

        tracing::info!(
            rule = %rule.name,
            goal = %rule.goal,
            station = %rule.station,
            tick = execution.started_at,
            "rule started"
        );
        Ok(execution)
    }

    fn reserve(
        &mut self,
        ctx: &EvalContext<'_>,
        slots: &[(String, EntityId)],
        reservations: &mut Reservations,
    ) -> Result<()> {
        let station = FixedConstraint::new(
            format!("{} station", self.rule.name),
            vec![self.rule.station.clone()],
        )
        .with_priority(self.rule.priority)
        .with_disposal(self.station_flag.clone());
        reservations
            .stations
            .add_constraint(Box::new(station), ctx.snapshot)?;

        for (slot, entity) in slots {
            self.reserve_entity(ctx, slot, *entity, reservations)?;
        }
        Ok(())
    }

    fn reserve_entity(
        &mut self,
        ctx: &EvalContext<'_>,
        slot: &str,
        entity: EntityId,
        reservations: &mut Reservations,
    ) -> Result<()> {
        let flag = DisposalFlag::new();
        let constraint = FixedConstraint::new(format!("{}/{slot}", self.rule.name), vec![entity])
            .with_priority(self.rule.priority)
            .with_disposal(flag.clone());
        reservations
            .entities
            .add_constraint(Box::new(constraint), ctx.snapshot)?;
        self.entity_flags.push(flag);
        Ok(())
    }

    /// The rule being executed.
    #[must_use]
    pub fn rule(&self) -> &CompiledRule {
        &self.rule
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    /// Host tick at which the execution started.
    #[must_use]
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// How the execution ended, once done.
    #[must_use]
    pub fn outcome(&self) -> Option<&ExecutionOutcome> {
        self.outcome.as_ref()
    }

    /// Returns true once the execution reached `Done`.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == ExecutionPhase::Done
    }

    /// Number of entity reservations held, including released ones.
    #[must_use]
    pub fn entity_reservations(&self) -> usize {
        self.entity_flags.len()
    }

    /// Requests cancellation. The execution finishes on the next advance;
    /// actions that already ran are not undone.
    pub fn cancel(&mut self) {
        self.cancel_requested = true;
        if let Some(pending) = &self.pending {
            pending.cancel();
        }
    }

    /// Advances the execution against a new snapshot. Returns the outcome on
    /// the call that finishes it.
    pub fn advance(
        &mut self,
        ctx: &EvalContext<'_>,
        reservations: &mut Reservations,
        actor: &mut ActionActor<Action>,
    ) -> Option<ExecutionOutcome> {
        if self.is_done() {
            return None;
        }
        // The actor checks the token before every action, so nothing more runs.
        if self.cancel_requested {
            return Some(self.finish(ExecutionOutcome::Cancelled));
        }

        if let Some(pending) = &self.pending {
            match pending.outcome() {
                None => return None,
                Some(TaskOutcome::Cancelled) => return Some(self.finish(ExecutionOutcome::Cancelled)),
                Some(TaskOutcome::Faulted(error)) => {
                    return Some(self.finish(ExecutionOutcome::Failed(error.to_string())));
                }
                Some(TaskOutcome::Completed(summary)) => {
                    self.pending = None;
                    if summary.recoveries > 0 {
                        return Some(self.finish(ExecutionOutcome::Failed(
                            "aborted after a failed action".to_string(),
                        )));
                    }
                    match self.phase {
                        ExecutionPhase::Starting => self.phase = ExecutionPhase::Ongoing,
                        ExecutionPhase::Collecting => {
                            return Some(self.finish(ExecutionOutcome::Completed));
                        }
                        ExecutionPhase::Ongoing | ExecutionPhase::Done => {}
                    }
                }
            }
        }

        let Some(station) = ctx.snapshot.station(&self.rule.station) else {
            return Some(self.finish(ExecutionOutcome::Failed(format!(
                "station {} disappeared",
                self.rule.station
            ))));
        };

        match station.state {
            StationState::Occupied => {
                self.fill_recipe_slots(station, ctx, reservations, actor);
                None
            }
            _ if station.has_output() => {
                let sequence = ActionList::new([Action::CollectOutput {
                    station: self.rule.station.clone(),
                }]);
                self.pending = Some(actor.enqueue(sequence));
                self.phase = ExecutionPhase::Collecting;
                tracing::debug!(rule = %self.rule.name, station = %self.rule.station, "collecting output");
                None
            }
            _ => Some(self.finish(ExecutionOutcome::Completed)),
        }
    }

    /// Queues one sequence slotting an entity into every open slot the
    /// running recipe asks for.
    fn fill_recipe_slots(
        &mut self,
        station: &Station,
        ctx: &EvalContext<'_>,
        reservations: &mut Reservations,
        actor: &mut ActionActor<Action>,
    ) {
        let Some(recipe) = &station.recipe else {
            return;
        };
        let rule = Rc::clone(&self.rule);
        let mut pool: Vec<&Entity> = ctx.available_entities();
        let mut actions = Vec::new();

        for assignment in rule.slots_for_recipe(recipe) {
            let key = (recipe.clone(), assignment.slot.clone());
            if self.filled.contains(&key) {
                continue;
            }
            let open = station
                .slot(&assignment.slot)
                .is_some_and(|slot| slot.entity.is_none());
            if !open {
                continue;
            }
            let Some(entity) = assignment.selector.choose(&pool, ctx) else {
                tracing::debug!(rule = %rule.name, slot = %assignment.slot, %recipe, "no entity for recipe slot");
                continue;
            };
            let entity_id = entity.id;
            if let Err(error) = self.reserve_entity(ctx, &assignment.slot, entity_id, reservations) {
                tracing::debug!(rule = %rule.name, slot = %assignment.slot, %error, "recipe slot not reserved");
                continue;
            }
            pool.retain(|e| e.id != entity_id);
            self.filled.insert(key);
            actions.push(Action::Slot {
                station: rule.station.clone(),
                slot: assignment.slot.clone(),
                entity: entity_id,
            });
        }

        if !actions.is_empty() {
            tracing::debug!(rule = %rule.name, %recipe, slots = actions.len(), "filling recipe slots");
            self.pending = Some(actor.enqueue(ActionList::new(actions)));
        }
    }

    fn release(&self) {
        self.station_flag.dispose();
        for flag in &self.entity_flags {
            flag.dispose();
        }
    }

    fn finish(&mut self, outcome: ExecutionOutcome) -> ExecutionOutcome {
        self.release();
        self.pending = None;
        self.phase = ExecutionPhase::Done;
        match &outcome {
            ExecutionOutcome::Failed(reason) => {
                tracing::warn!(rule = %self.rule.name, station = %self.rule.station, %reason, "rule failed");
            }
            _ => {
                tracing::info!(rule = %self.rule.name, station = %self.rule.station, %outcome, "rule finished");
            }
        }
        self.outcome = Some(outcome.clone());
        outcome
    }
}
