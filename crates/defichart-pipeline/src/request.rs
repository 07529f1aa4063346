//! Latest-request gate: only the most recently issued computation may
//! publish its result.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Handle identifying one issued computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Sequence number of the ticket.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Holds the result of the most recent request, discarding superseded ones.
///
/// Each new request takes a [`Ticket`]. A result is committed only if its
/// ticket is still the latest one issued, so a slow, stale computation can
/// never overwrite the output of a newer request.
#[derive(Debug)]
pub struct LatestResult<T> {
    issued: AtomicU64,
    committed: Mutex<Option<(Ticket, T)>>,
}

impl<T> Default for LatestResult<T> {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            committed: Mutex::new(None),
        }
    }
}

impl<T> LatestResult<T> {
    /// Creates an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for a new request, superseding all earlier ones.
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the most recently issued one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Stores `value` if `ticket` is current. Returns whether it was stored.
    pub fn commit(&self, ticket: Ticket, value: T) -> bool {
        let mut committed = self.committed.lock();
        // Checked under the lock so a commit cannot interleave with a newer one.
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, "Discarding superseded result");
            return false;
        }
        *committed = Some((ticket, value));
        true
    }

    /// Ticket of the committed result, if any.
    pub fn committed_ticket(&self) -> Option<Ticket> {
        self.committed.lock().as_ref().map(|(ticket, _)| *ticket)
    }

    /// Issues a ticket, awaits `computation` and commits its output.
    ///
    /// Returns whether the output was committed.
    pub async fn run<F>(&self, computation: F) -> bool
    where
        F: Future<Output = T>,
    {
        let ticket = self.issue();
        let value = computation.await;
        self.commit(ticket, value)
    }
}

impl<T: Clone> LatestResult<T> {
    /// Clone of the committed result.
    pub fn latest(&self) -> Option<T> {
        self.committed.lock().as_ref().map(|(_, value)| value.clone())
    }
}
