//! Recovery from failed actions.
//!
//! [`Recovering`] wraps a sequence and routes its failures to a recovery
//! function that returns a substitute sequence, typically a graceful abort.
//! Recovery happens at most once: a failure inside the substitute, or from
//! the recovery function itself, is fatal, so a sequence always terminates.

use std::fmt;

use autarch_foundation::{Error, Result};

use crate::actor::ActionSequence;

/// Produces a substitute sequence for an error.
pub type RecoveryFn<A> = Box<dyn FnMut(&Error) -> Result<Box<dyn ActionSequence<A>>>>;

/// A sequence with a recovery handler.
pub struct Recovering<A> {
    current: Box<dyn ActionSequence<A>>,
    recover: RecoveryFn<A>,
    recovered: bool,
}

impl<A> fmt::Debug for Recovering<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovering")
            .field("recovered", &self.recovered)
            .finish_non_exhaustive()
    }
}

impl<A: 'static> Recovering<A> {
    /// Wraps `inner`, recovering with `recover`.
    pub fn new<S, F>(inner: S, recover: F) -> Self
    where
        S: ActionSequence<A> + 'static,
        F: FnMut(&Error) -> Result<Box<dyn ActionSequence<A>>> + 'static,
    {
        Self {
            current: Box::new(inner),
            recover: Box::new(recover),
            recovered: false,
        }
    }

    /// Returns true once the substitute sequence took over.
    #[must_use]
    pub fn has_recovered(&self) -> bool {
        self.recovered
    }

    fn recover_from(&mut self, error: &Error) -> Result<()> {
        if self.recovered {
            return Err(Error::recovery_failed(format!(
                "failure while recovering: {error}"
            )));
        }
        let substitute = (self.recover)(error).map_err(|handler_error| {
            Error::recovery_failed(format!(
                "recovery handler failed on '{error}': {handler_error}"
            ))
        })?;
        tracing::info!(%error, "recovering action sequence");
        self.current = substitute;
        self.recovered = true;
        Ok(())
    }
}

impl<A: 'static> ActionSequence<A> for Recovering<A> {
    fn next_action(&mut self) -> Result<Option<A>> {
        match self.current.next_action() {
            Ok(next) => Ok(next),
            Err(error) => {
                self.recover_from(&error)?;
                self.current.next_action().map_err(|substitute_error| {
                    Error::recovery_failed(format!(
                        "substitute sequence failed: {substitute_error}"
                    ))
                })
            }
        }
    }

    fn on_action_failed(&mut self, action: &A, error: Error) -> Result<()> {
        if self.recovered {
            return self.recover_from(&error);
        }
        match self.current.on_action_failed(action, error) {
            Ok(()) => Ok(()),
            Err(error) => self.recover_from(&error),
        }
    }

    fn recoveries(&self) -> usize {
        usize::from(self.recovered) + self.current.recoveries()
    }
}
