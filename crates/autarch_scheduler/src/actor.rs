//! The action actor: executes queued action sequences one action per tick.
//!
//! Sequences produce actions lazily. Per tick the actor waits out the
//! inter-action delay, activates the next queued sequence if none is active,
//! polls cancellation, pulls exactly one action and executes it through the
//! [`ActionSink`]. After a successful action it peeks the next one, so an
//! exhausted sequence completes in the same tick as its last action.
//!
//! Sink failures are first offered to the sequence through
//! [`ActionSequence::on_action_failed`]; if the sequence does not recover,
//! it faults. Errors while producing the next action fault it directly.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use autarch_foundation::{Error, Result};

use crate::task::{CancellationToken, TaskHandle, TaskOutcome, TaskState, Tick};

// =============================================================================
// Traits
// =============================================================================

/// A lazily produced sequence of actions.
pub trait ActionSequence<A> {
    /// Produces the next action, or `None` when the sequence is done.
    ///
    /// # Errors
    /// Any error faults the sequence unless the sequence handles it itself.
    fn next_action(&mut self) -> Result<Option<A>>;

    /// Offered an action's failure. Returning `Ok` means the sequence
    /// recovered and should continue.
    ///
    /// # Errors
    /// Returns the error (or a replacement) when the sequence cannot recover.
    fn on_action_failed(&mut self, action: &A, error: Error) -> Result<()> {
        let _ = action;
        Err(error)
    }

    /// How many times this sequence recovered from a failure.
    fn recoveries(&self) -> usize {
        0
    }
}

/// Performs actions against the simulation.
pub trait ActionSink<A> {
    /// Executes one action.
    ///
    /// # Errors
    /// Returns a domain error when the action could not be performed.
    fn execute(&mut self, action: &A) -> Result<()>;
}

impl<A, F> ActionSink<A> for F
where
    F: FnMut(&A) -> Result<()>,
{
    fn execute(&mut self, action: &A) -> Result<()> {
        self(action)
    }
}

/// A fixed list of actions.
#[derive(Clone, Debug)]
pub struct ActionList<A> {
    actions: VecDeque<A>,
}

impl<A> ActionList<A> {
    /// Creates a sequence from actions in execution order.
    #[must_use]
    pub fn new(actions: impl IntoIterator<Item = A>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }
}

impl<A> ActionSequence<A> for ActionList<A> {
    fn next_action(&mut self) -> Result<Option<A>> {
        Ok(self.actions.pop_front())
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Identifies a sequence queued on one actor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// What a completed sequence did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceSummary {
    /// Actions that were executed, including failed ones.
    pub executed: usize,
    /// Actions whose execution failed and was recovered.
    pub failed: usize,
    /// Recoveries reported by the sequence.
    pub recoveries: usize,
}

/// The caller's side of a queued sequence.
#[derive(Clone, Debug)]
pub struct PendingActionSequence {
    /// Sequence id.
    pub id: SequenceId,
    /// Completion handle.
    pub handle: TaskHandle<SequenceSummary>,
    /// Cancellation token.
    pub token: CancellationToken,
}

impl PendingActionSequence {
    /// Requests cancellation, observed at the next tick.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.handle.state()
    }

    /// Returns true once the sequence reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// The outcome, once finished.
    #[must_use]
    pub fn outcome(&self) -> Option<TaskOutcome<SequenceSummary>> {
        self.handle.outcome()
    }
}

// =============================================================================
// Actor
// =============================================================================

struct Queued<A> {
    id: SequenceId,
    sequence: Box<dyn ActionSequence<A>>,
    handle: TaskHandle<SequenceSummary>,
    token: CancellationToken,
}

struct Active<A> {
    queued: Queued<A>,
    peeked: Option<A>,
    summary: SequenceSummary,
}

impl<A> Active<A> {
    fn finish(mut self, outcome: TaskOutcome<()>) -> (SequenceId, TaskState) {
        self.summary.recoveries = self.queued.sequence.recoveries();
        let outcome = match outcome {
            TaskOutcome::Completed(()) => TaskOutcome::Completed(self.summary),
            TaskOutcome::Cancelled => TaskOutcome::Cancelled,
            TaskOutcome::Faulted(error) => TaskOutcome::Faulted(error),
        };
        let state = outcome.state();
        match &outcome {
            TaskOutcome::Faulted(error) => {
                tracing::warn!(sequence = %self.queued.id, %error, "action sequence faulted");
            }
            _ => {
                tracing::debug!(sequence = %self.queued.id, %state, executed = self.summary.executed, "action sequence finished");
            }
        }
        self.queued.handle.resolve(outcome);
        (self.queued.id, state)
    }
}

/// What happened during one actor tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorReport {
    /// The sequence whose action ran this tick, if any.
    pub executed: Option<SequenceId>,
    /// Sequences that reached a terminal state this tick.
    pub finished: Vec<(SequenceId, TaskState)>,
    /// True if the tick was skipped because the delay had not elapsed.
    pub throttled: bool,
}

/// Executes queued sequences, one action per tick.
pub struct ActionActor<A> {
    queue: VecDeque<Queued<A>>,
    active: Option<Active<A>>,
    delay: Duration,
    last_action_at: Option<Duration>,
    next_id: u64,
}

impl<A> fmt::Debug for ActionActor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionActor")
            .field("queued", &self.queue.len())
            .field("active", &self.active.as_ref().map(|a| a.queued.id))
            .field("delay", &self.delay)
            .finish()
    }
}

impl<A> Default for ActionActor<A> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl<A> ActionActor<A> {
    /// Creates an actor that waits at least `delay` between actions.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            active: None,
            delay,
            last_action_at: None,
            next_id: 0,
        }
    }

    /// The inter-action delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Queues a sequence.
    pub fn enqueue<S>(&mut self, sequence: S) -> PendingActionSequence
    where
        S: ActionSequence<A> + 'static,
    {
        self.enqueue_with_token(Box::new(sequence), CancellationToken::new())
    }

    /// Queues a boxed sequence observing the given token.
    pub fn enqueue_with_token(
        &mut self,
        sequence: Box<dyn ActionSequence<A>>,
        token: CancellationToken,
    ) -> PendingActionSequence {
        let id = SequenceId(self.next_id);
        self.next_id += 1;
        let handle = TaskHandle::new();
        self.queue.push_back(Queued {
            id,
            sequence,
            handle: handle.clone(),
            token: token.clone(),
        });
        tracing::trace!(sequence = %id, queued = self.queue.len(), "action sequence queued");
        PendingActionSequence { id, handle, token }
    }

    /// Number of sequences waiting behind the active one.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is active or queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    /// Advances the actor by one tick.
    pub fn tick(&mut self, tick: &Tick, sink: &mut dyn ActionSink<A>) -> ActorReport {
        let mut report = ActorReport::default();

        // Cancelled sequences leave the queue without ever becoming active.
        self.queue.retain(|queued| {
            if queued.token.is_cancelled() {
                queued.handle.resolve(TaskOutcome::Cancelled);
                report.finished.push((queued.id, TaskState::Cancelled));
                false
            } else {
                true
            }
        });

        if let Some(last) = self.last_action_at {
            if tick.now < last.saturating_add(self.delay) {
                report.throttled = true;
                return report;
            }
        }

        loop {
            let Some(mut active) = self.active.take().or_else(|| self.activate_next()) else {
                return report;
            };

            if active.queued.token.is_cancelled() {
                report.finished.push(active.finish(TaskOutcome::Cancelled));
                continue;
            }

            let action = match active.peeked.take() {
                Some(action) => action,
                None => match active.queued.sequence.next_action() {
                    Ok(Some(action)) => action,
                    Ok(None) => {
                        report.finished.push(active.finish(TaskOutcome::Completed(())));
                        continue;
                    }
                    Err(error) => {
                        // The next queued sequence waits for a later tick.
                        report.finished.push(active.finish(TaskOutcome::Faulted(error)));
                        return report;
                    }
                },
            };

            report.executed = Some(active.queued.id);
            self.last_action_at = Some(tick.now);
            active.summary.executed += 1;

            if let Err(error) = sink.execute(&action) {
                tracing::debug!(sequence = %active.queued.id, %error, "action failed");
                match active.queued.sequence.on_action_failed(&action, error) {
                    Ok(()) => active.summary.failed += 1,
                    Err(error) => {
                        report.finished.push(active.finish(TaskOutcome::Faulted(error)));
                        return report;
                    }
                }
            }

            match active.queued.sequence.next_action() {
                Ok(Some(next)) => {
                    active.peeked = Some(next);
                    self.active = Some(active);
                }
                Ok(None) => report.finished.push(active.finish(TaskOutcome::Completed(()))),
                Err(error) => report.finished.push(active.finish(TaskOutcome::Faulted(error))),
            }
            return report;
        }
    }

    fn activate_next(&mut self) -> Option<Active<A>> {
        let queued = self.queue.pop_front()?;
        queued.handle.activate();
        tracing::trace!(sequence = %queued.id, "action sequence active");
        Some(Active {
            queued,
            peeked: None,
            summary: SequenceSummary::default(),
        })
    }
}
