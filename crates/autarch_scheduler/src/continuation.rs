//! Continuations from background work back onto the tick thread.
//!
//! Background threads never touch core state. They send a closure through a
//! [`ContinuationSender`]; the tick thread drains the queue at the start of
//! each tick and runs every closure against its state in arrival order.

use crossbeam_channel::{Receiver, Sender, unbounded};

use autarch_foundation::{Error, ErrorKind, Result};

/// Work to run on the tick thread.
pub type Continuation<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Sending side, cloneable and `Send`.
pub struct ContinuationSender<S> {
    sender: Sender<Continuation<S>>,
}

impl<S> Clone for ContinuationSender<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S> ContinuationSender<S> {
    /// Schedules a closure for the next tick.
    ///
    /// # Errors
    /// Returns an internal error if the queue was dropped.
    pub fn send<F>(&self, continuation: F) -> Result<()>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.sender
            .send(Box::new(continuation))
            .map_err(|_| Error::new(ErrorKind::Internal("continuation queue closed".to_string())))
    }
}

/// Receiving side, owned by the tick thread.
pub struct ContinuationQueue<S> {
    sender: Sender<Continuation<S>>,
    receiver: Receiver<Continuation<S>>,
}

/// Clones share one channel, so the tick thread can drain through a clone
/// while the state it drains into owns the original.
impl<S> Clone for ContinuationQueue<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<S> Default for ContinuationQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for ContinuationQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationQueue")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl<S> ContinuationQueue<S> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A new sender for background work.
    #[must_use]
    pub fn sender(&self) -> ContinuationSender<S> {
        ContinuationSender {
            sender: self.sender.clone(),
        }
    }

    /// Number of continuations waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Runs every continuation received so far. Returns how many ran.
    ///
    /// Continuations sent while draining run on the next drain.
    pub fn drain(&self, state: &mut S) -> usize {
        let available = self.receiver.len();
        let mut ran = 0;
        while ran < available {
            let Ok(continuation) = self.receiver.try_recv() else {
                break;
            };
            continuation(state);
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "continuations drained");
        }
        ran
    }
}
