//! Heartbeat-driven tasks.
//!
//! The [`Heartbeat`] owns every active task in a table keyed by [`TaskId`].
//! Each tick visits the tasks in spawn order; a task that reaches a terminal
//! state is removed from the table and its [`TaskHandle`] resolved. Nothing
//! subscribes itself: tasks exist exactly as long as the table holds them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use autarch_foundation::Error;

use crate::task::{CancellationToken, TaskHandle, TaskOutcome, Tick};

// =============================================================================
// Work
// =============================================================================

/// Result of advancing a task by one tick.
#[derive(Debug)]
pub enum Step<T> {
    /// Not done yet.
    Pending,
    /// Done with a value.
    Ready(T),
    /// Done with an error.
    Failed(Error),
}

/// Work advanced once per tick.
pub trait HeartbeatWork {
    /// Value produced on completion.
    type Output;

    /// Advances the work.
    fn update(&mut self, tick: &Tick) -> Step<Self::Output>;
}

/// Identifies a task within one heartbeat. Ids increase with spawn order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

trait ScheduledTask {
    /// Advances the task. Returns true once it reached a terminal state.
    fn advance(&mut self, tick: &Tick) -> bool;
    fn cancel(&self);
}

struct Entry<W: HeartbeatWork> {
    work: W,
    handle: TaskHandle<W::Output>,
    token: CancellationToken,
}

impl<W: HeartbeatWork> ScheduledTask for Entry<W> {
    fn advance(&mut self, tick: &Tick) -> bool {
        if self.token.is_cancelled() {
            self.handle.resolve(TaskOutcome::Cancelled);
            return true;
        }
        match self.work.update(tick) {
            Step::Pending => false,
            Step::Ready(value) => {
                self.handle.resolve(TaskOutcome::Completed(value));
                true
            }
            Step::Failed(error) => {
                self.handle.resolve(TaskOutcome::Faulted(error));
                true
            }
        }
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

// =============================================================================
// Heartbeat
// =============================================================================

/// Table of active tasks, ticked explicitly by the host.
#[derive(Default)]
pub struct Heartbeat {
    tasks: BTreeMap<TaskId, Box<dyn ScheduledTask>>,
    next_id: u64,
}

impl fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heartbeat")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Heartbeat {
    /// Creates an empty heartbeat.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task with its own cancellation token.
    pub fn spawn<W>(&mut self, work: W) -> (TaskId, TaskHandle<W::Output>)
    where
        W: HeartbeatWork + 'static,
    {
        self.spawn_with_token(work, CancellationToken::new())
    }

    /// Adds a task observing the given cancellation token.
    pub fn spawn_with_token<W>(
        &mut self,
        work: W,
        token: CancellationToken,
    ) -> (TaskId, TaskHandle<W::Output>)
    where
        W: HeartbeatWork + 'static,
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let handle = TaskHandle::new();
        handle.activate();
        self.tasks.insert(
            id,
            Box::new(Entry {
                work,
                handle: handle.clone(),
                token,
            }),
        );
        (id, handle)
    }

    /// Requests cancellation; the task resolves `Cancelled` on the next tick.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.tasks.get(&id) {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// Advances every task in spawn order. Returns how many finished.
    pub fn tick(&mut self, tick: &Tick) -> usize {
        let finished: Vec<TaskId> = self
            .tasks
            .iter_mut()
            .filter_map(|(id, task)| task.advance(tick).then_some(*id))
            .collect();
        for id in &finished {
            self.tasks.remove(id);
        }
        if !finished.is_empty() {
            tracing::trace!(finished = finished.len(), remaining = self.tasks.len(), %tick, "heartbeat tasks finished");
        }
        finished.len()
    }

    /// Returns true if the task is still in the table.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Number of active tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no task is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// =============================================================================
// Primitives
// =============================================================================

/// Completes on the first tick the predicate holds.
pub struct WaitUntil<P> {
    predicate: P,
}

impl<P: FnMut(&Tick) -> bool> WaitUntil<P> {
    /// Creates the task.
    #[must_use]
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P: FnMut(&Tick) -> bool> HeartbeatWork for WaitUntil<P> {
    type Output = ();

    fn update(&mut self, tick: &Tick) -> Step<()> {
        if (self.predicate)(tick) {
            Step::Ready(())
        } else {
            Step::Pending
        }
    }
}

/// Completes once host time reaches a deadline.
#[derive(Copy, Clone, Debug)]
pub struct Delay {
    duration: Duration,
    deadline: Option<Duration>,
}

impl Delay {
    /// Waits `duration`, measured from the first tick the task sees.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    /// Waits until host time reaches `deadline`.
    #[must_use]
    pub fn until(deadline: Duration) -> Self {
        Self {
            duration: Duration::ZERO,
            deadline: Some(deadline),
        }
    }
}

impl HeartbeatWork for Delay {
    type Output = Duration;

    fn update(&mut self, tick: &Tick) -> Step<Duration> {
        let deadline = *self
            .deadline
            .get_or_insert_with(|| tick.now.saturating_add(self.duration));
        if tick.now >= deadline {
            Step::Ready(tick.now)
        } else {
            Step::Pending
        }
    }
}

/// Races work against a deadline. Whichever loses is dropped.
pub struct Timeout<W> {
    work: Option<W>,
    limit: Duration,
    deadline: Option<Duration>,
}

impl<W: HeartbeatWork> Timeout<W> {
    /// Fails with a timeout error if `work` is not done within `limit`,
    /// measured from the first tick the task sees.
    #[must_use]
    pub fn new(work: W, limit: Duration) -> Self {
        Self {
            work: Some(work),
            limit,
            deadline: None,
        }
    }
}

impl<W: HeartbeatWork> HeartbeatWork for Timeout<W> {
    type Output = W::Output;

    fn update(&mut self, tick: &Tick) -> Step<W::Output> {
        let deadline = *self
            .deadline
            .get_or_insert_with(|| tick.now.saturating_add(self.limit));
        let Some(work) = self.work.as_mut() else {
            return Step::Failed(Error::timeout(duration_ms(self.limit)));
        };

        match work.update(tick) {
            Step::Pending if tick.now >= deadline => {
                self.work = None;
                Step::Failed(Error::timeout(duration_ms(self.limit)))
            }
            step => step,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
