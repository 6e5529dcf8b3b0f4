//! Ticks, cancellation and completion handles.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use autarch_foundation::Error;

// =============================================================================
// Tick
// =============================================================================

/// One beat of the host's heartbeat.
///
/// `now` is host time, so delays are reproducible when a recorded tick log
/// is replayed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick {
    /// Sequential tick number.
    pub number: u64,
    /// Host time at this tick.
    pub now: Duration,
}

impl Tick {
    /// Creates a tick.
    #[must_use]
    pub const fn new(number: u64, now: Duration) -> Self {
        Self { number, now }
    }

    /// Tick `number` on a fixed interval starting at zero.
    #[must_use]
    pub fn every(number: u64, interval: Duration) -> Self {
        let factor = u32::try_from(number).unwrap_or(u32::MAX);
        Self::new(number, interval.saturating_mul(factor))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {} @ {}ms", self.number, self.now.as_millis())
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation flag, observed at the next tick boundary.
///
/// The token is `Send` so background work can cancel, but cancellation only
/// takes effect on the tick thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Terminal result of a task or action sequence.
#[derive(Clone, Debug)]
pub enum TaskOutcome<T> {
    /// Finished normally.
    Completed(T),
    /// Cancelled before finishing. Not an error.
    Cancelled,
    /// Failed.
    Faulted(Error),
}

impl<T> TaskOutcome<T> {
    /// Returns the terminal state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        match self {
            Self::Completed(_) => TaskState::Completed,
            Self::Cancelled => TaskState::Cancelled,
            Self::Faulted(_) => TaskState::Faulted,
        }
    }

    /// Returns true if completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Lifecycle of a task: `Queued → Active → {Completed | Cancelled | Faulted}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting for its turn.
    Queued,
    /// Being advanced.
    Active,
    /// Finished normally.
    Completed,
    /// Cancelled.
    Cancelled,
    /// Failed.
    Faulted,
}

impl TaskState {
    /// Returns true for the three terminal states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Faulted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Handles
// =============================================================================

#[derive(Debug)]
struct Slot<T> {
    state: TaskState,
    outcome: Option<TaskOutcome<T>>,
}

/// Observes a task's progress and outcome.
///
/// Handles are cheap clones of one shared slot; the scheduler resolves it
/// exactly once.
#[derive(Debug)]
pub struct TaskHandle<T>(Rc<RefCell<Slot<T>>>);

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(Slot {
            state: TaskState::Queued,
            outcome: None,
        })))
    }

    pub(crate) fn activate(&self) {
        let mut slot = self.0.borrow_mut();
        if slot.state == TaskState::Queued {
            slot.state = TaskState::Active;
        }
    }

    /// Stores the outcome. Later resolutions are ignored.
    pub(crate) fn resolve(&self, outcome: TaskOutcome<T>) {
        let mut slot = self.0.borrow_mut();
        if slot.state.is_terminal() {
            return;
        }
        slot.state = outcome.state();
        slot.outcome = Some(outcome);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.0.borrow().state
    }

    /// Returns true once the task reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Takes the outcome, leaving the state in place.
    #[must_use]
    pub fn take_outcome(&self) -> Option<TaskOutcome<T>> {
        self.0.borrow_mut().outcome.take()
    }
}

impl<T: Clone> TaskHandle<T> {
    /// A copy of the outcome, if resolved and not yet taken.
    #[must_use]
    pub fn outcome(&self) -> Option<TaskOutcome<T>> {
        self.0.borrow().outcome.clone()
    }
}
