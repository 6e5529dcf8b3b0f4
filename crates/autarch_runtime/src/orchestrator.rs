//! The per-tick composition root.
//!
//! Each call to [`Orchestrator::tick`] runs one full decision cycle:
//!
//! 1. Drain continuations sent by background work
//! 2. Accept a fresh snapshot, rejecting stale ones
//! 3. Prune disposed reservations
//! 4. Advance running executions
//! 5. Evaluate the rules of active goals, highest priority first
//! 6. Start every admissible rule
//! 7. Tick the heartbeat, then the action actor
//! 8. Emit decision records

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use autarch_engine::{
    CompiledRule, ConditionEngine, EvalContext, FailureReason, Goal, GoalStatus, HeldResources,
    Reservations,
};
use autarch_foundation::{ErrorContext, GameStateSnapshot, Result, SnapshotCell, SnapshotVersion};
use autarch_scheduler::{
    ActionActor, ActionSink, ActorReport, ContinuationQueue, ContinuationSender, Heartbeat, Tick,
};

use crate::actions::Action;
use crate::config::EngineConfig;
use crate::diagnostics::{ArchiveSink, DecisionOutcome, DecisionRecord, DiagnosticsSink, NullSink};
use crate::execution::{ExecutionOutcome, RuleExecution};

// =============================================================================
// Host Interfaces
// =============================================================================

/// Supplies a fresh snapshot of the game every tick.
pub trait SnapshotProvider {
    /// Captures the current game state.
    ///
    /// # Errors
    /// Returns an error if the state cannot be captured.
    fn snapshot(&mut self, tick: &Tick) -> Result<GameStateSnapshot>;
}

impl<F> SnapshotProvider for F
where
    F: FnMut(&Tick) -> Result<GameStateSnapshot>,
{
    fn snapshot(&mut self, tick: &Tick) -> Result<GameStateSnapshot> {
        self(tick)
    }
}

/// What one tick did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Host tick number.
    pub tick: u64,
    /// Version of the snapshot the tick decided against.
    pub snapshot: Option<SnapshotVersion>,
    /// Continuations that ran.
    pub continuations: usize,
    /// Rules started this tick.
    pub started: Vec<String>,
    /// Executions that finished this tick.
    pub finished: Vec<(String, ExecutionOutcome)>,
    /// Heartbeat tasks that finished this tick.
    pub heartbeat_finished: usize,
    /// What the action actor did.
    pub actor: ActorReport,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives goals toward completion, one tick at a time.
pub struct Orchestrator<P, K> {
    config: EngineConfig,
    goals: Vec<Goal>,
    rules: Vec<Rc<CompiledRule>>,
    goal_status: HashMap<String, GoalStatus>,
    provider: P,
    sink: K,
    diagnostics: Box<dyn DiagnosticsSink>,
    snapshots: SnapshotCell,
    engine: ConditionEngine,
    reservations: Reservations,
    heartbeat: Heartbeat,
    actor: ActionActor<Action>,
    continuations: ContinuationQueue<Orchestrator<P, K>>,
    executions: Vec<RuleExecution>,
}

impl<P, K> fmt::Debug for Orchestrator<P, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("goals", &self.goals.len())
            .field("rules", &self.rules.len())
            .field("executions", &self.executions.len())
            .field("actor", &self.actor)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}

impl<P, K> Orchestrator<P, K>
where
    P: SnapshotProvider,
    K: ActionSink<Action>,
{
    /// Creates an orchestrator that discards decision records.
    #[must_use]
    pub fn new(config: EngineConfig, goals: Vec<Goal>, provider: P, sink: K) -> Self {
        let mut rules: Vec<Rc<CompiledRule>> = goals
            .iter()
            .flat_map(|goal| goal.rules.iter().cloned().map(Rc::new))
            .collect();
        // Stable: equal priorities keep declaration order across goals.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self {
            actor: ActionActor::new(config.action_delay()),
            config,
            goals,
            rules,
            goal_status: HashMap::new(),
            provider,
            sink,
            diagnostics: Box::new(NullSink),
            snapshots: SnapshotCell::new(),
            engine: ConditionEngine::new(),
            reservations: Reservations::new(),
            heartbeat: Heartbeat::new(),
            continuations: ContinuationQueue::new(),
            executions: Vec::new(),
        }
    }

    /// Creates an orchestrator, archiving decisions if the configuration
    /// names a diagnostics directory.
    ///
    /// # Errors
    /// Returns `Io` if the diagnostics directory cannot be created.
    pub fn from_config(config: EngineConfig, goals: Vec<Goal>, provider: P, sink: K) -> Result<Self> {
        let archive = config
            .diagnostics_dir
            .as_ref()
            .map(ArchiveSink::open)
            .transpose()?;
        let orchestrator = Self::new(config, goals, provider, sink);
        Ok(match archive {
            Some(archive) => orchestrator.with_diagnostics(archive),
            None => orchestrator,
        })
    }

    /// Sends decision records to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Runs one decision cycle.
    ///
    /// # Errors
    /// Returns an error if the provider fails or hands back a snapshot that is
    /// not newer than the last accepted one. Nothing else runs on that tick.
    pub fn tick(&mut self, tick: Tick) -> Result<TickReport> {
        let mut report = TickReport {
            tick: tick.number,
            continuations: self.drain_continuations(),
            ..TickReport::default()
        };

        let snapshot = self
            .provider
            .snapshot(&tick)
            .and_then(|snapshot| self.snapshots.publish(snapshot))
            .map_err(|e| {
                tracing::warn!(%tick, error = %e, "snapshot rejected");
                e.with_context(ErrorContext::new().with_tick(tick.number))
            })?;
        report.snapshot = Some(snapshot.version());

        self.engine.observe(snapshot.version());
        self.reservations.prune_disposed();

        let mut decisions = Vec::new();
        report.finished = self.advance_executions(&snapshot, &tick, &mut decisions);
        report.started = self.start_admissible(&snapshot, &tick, &mut decisions);

        report.heartbeat_finished = self.heartbeat.tick(&tick);
        report.actor = self.actor.tick(&tick, &mut self.sink);

        self.emit(&decisions);
        Ok(report)
    }

    fn drain_continuations(&mut self) -> usize {
        let queue = self.continuations.clone();
        queue.drain(self)
    }

    fn advance_executions(
        &mut self,
        snapshot: &GameStateSnapshot,
        tick: &Tick,
        decisions: &mut Vec<DecisionRecord>,
    ) -> Vec<(String, ExecutionOutcome)> {
        let mut finished = Vec::new();
        for execution in &mut self.executions {
            let held = self.reservations.held(snapshot);
            let ctx = EvalContext::new(snapshot, &held);
            if let Some(outcome) = execution.advance(&ctx, &mut self.reservations, &mut self.actor) {
                let rule = execution.rule();
                decisions.push(DecisionRecord {
                    rule: rule.name.clone(),
                    goal: rule.goal.clone(),
                    tick: tick.number,
                    snapshot: snapshot.version().raw(),
                    outcome: match &outcome {
                        ExecutionOutcome::Completed => DecisionOutcome::Completed,
                        ExecutionOutcome::Failed(reason) => DecisionOutcome::Failed(reason.clone()),
                        ExecutionOutcome::Cancelled => DecisionOutcome::Cancelled,
                    },
                    trace: None,
                });
                finished.push((rule.name.clone(), outcome));
            }
        }
        self.executions.retain(|execution| !execution.is_done());
        finished
    }

    fn update_goals(&mut self, snapshot: &GameStateSnapshot) {
        let held = self.reservations.held(snapshot);
        let ctx = EvalContext::new(snapshot, &held);
        for goal in &self.goals {
            let status = goal.status(&mut self.engine, &ctx);
            let previous = self.goal_status.insert(goal.name.clone(), status);
            if previous != Some(status) {
                tracing::info!(goal = %goal.name, ?status, "goal status changed");
            }
        }
    }

    fn start_admissible(
        &mut self,
        snapshot: &GameStateSnapshot,
        tick: &Tick,
        decisions: &mut Vec<DecisionRecord>,
    ) -> Vec<String> {
        self.update_goals(snapshot);
        let candidates: Vec<Rc<CompiledRule>> = self
            .rules
            .iter()
            .filter(|rule| self.goal_status.get(&rule.goal) == Some(&GoalStatus::Active))
            .filter(|rule| !self.is_running(&rule.name))
            .cloned()
            .collect();

        let trace = self.config.trace_mode();
        let mut started = Vec::new();
        for rule in candidates {
            let held = self.reservations.held(snapshot);
            let ctx = EvalContext::new(snapshot, &held).with_trace(trace);
            let admission = rule.admission(&mut self.engine, &ctx);

            let mut record = DecisionRecord {
                rule: rule.name.clone(),
                goal: rule.goal.clone(),
                tick: tick.number,
                snapshot: snapshot.version().raw(),
                outcome: DecisionOutcome::Blocked,
                trace: admission.reason().map(FailureReason::render),
            };

            if admission.is_met() {
                match RuleExecution::start(Rc::clone(&rule), &ctx, &mut self.reservations, &mut self.actor) {
                    Ok(execution) => {
                        record.outcome = DecisionOutcome::Started;
                        started.push(rule.name.clone());
                        self.executions.push(execution);
                    }
                    Err(error) => {
                        tracing::warn!(rule = %rule.name, %error, "rule admitted but could not start");
                        record.outcome = DecisionOutcome::Failed(error.to_string());
                    }
                }
            } else {
                tracing::debug!(rule = %rule.name, trace = record.trace.as_deref().unwrap_or(""), "rule blocked");
            }
            decisions.push(record);
        }
        started
    }

    fn emit(&mut self, decisions: &[DecisionRecord]) {
        for record in decisions {
            if let Err(error) = self.diagnostics.record(record) {
                tracing::warn!(rule = %record.rule, %error, "decision record dropped");
            }
        }
    }
}

impl<P, K> Orchestrator<P, K> {
    /// A sender background work uses to run code on the tick thread.
    #[must_use]
    pub fn continuations(&self) -> ContinuationSender<Self> {
        self.continuations.sender()
    }

    /// Returns true if an execution of the named rule is running.
    #[must_use]
    pub fn is_running(&self, rule: &str) -> bool {
        self.executions.iter().any(|e| e.rule().name == rule)
    }

    /// Cancels every running execution of the named rule. Returns how many
    /// were cancelled; they finish on the next tick.
    pub fn cancel_rule(&mut self, rule: &str) -> usize {
        let mut cancelled = 0;
        for execution in self.executions.iter_mut().filter(|e| e.rule().name == rule) {
            execution.cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            tracing::info!(rule, cancelled, "rule cancellation requested");
        }
        cancelled
    }

    /// Running executions.
    pub fn executions(&self) -> impl Iterator<Item = &RuleExecution> {
        self.executions.iter()
    }

    /// Last known status of a goal.
    #[must_use]
    pub fn goal_status(&self, goal: &str) -> Option<GoalStatus> {
        self.goal_status.get(goal).copied()
    }

    /// The goals being pursued.
    #[must_use]
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// The last accepted snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Arc<GameStateSnapshot>> {
        self.snapshots.current()
    }

    /// What the ledgers hold against the last accepted snapshot.
    pub fn held(&mut self) -> HeldResources {
        match self.snapshots.current() {
            Some(snapshot) => self.reservations.held(snapshot),
            None => HeldResources::none(),
        }
    }

    /// The reservation ledgers.
    pub fn reservations_mut(&mut self) -> &mut Reservations {
        &mut self.reservations
    }

    /// The heartbeat, for hosts that schedule their own tasks.
    pub fn heartbeat_mut(&mut self) -> &mut Heartbeat {
        &mut self.heartbeat
    }

    /// The condition engine.
    #[must_use]
    pub fn engine(&self) -> &ConditionEngine {
        &self.engine
    }

    /// The action actor.
    #[must_use]
    pub fn actor(&self) -> &ActionActor<Action> {
        &self.actor
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enables or disables failure explanations for later decisions.
    pub fn set_trace(&mut self, trace: bool) {
        self.config.trace = trace;
    }

    /// The snapshot provider.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The action sink.
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}
