//! Single-slot debouncer: at most one deferred event is pending, and
//! scheduling a new one cancels the previous.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    ticket: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ticket: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Deliver `make(ticket)` on `tx` once the delay has passed, superseding
    /// any event still waiting. Returns the new ticket.
    pub fn schedule<E, F>(&mut self, tx: &UnboundedSender<E>, make: F) -> u64
    where
        E: Send + 'static,
        F: FnOnce(u64) -> E,
    {
        if self.cancel() {
            tracing::debug!(ticket = self.ticket, "Debounced event superseded");
        }
        self.ticket += 1;
        let ticket = self.ticket;
        let event = make(ticket);
        let tx = tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }));
        ticket
    }

    /// Drop the pending event, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim a delivered ticket. Returns false for superseded tickets, which
    /// callers must ignore.
    pub fn fire(&mut self, ticket: u64) -> bool {
        if self.pending.is_some() && ticket == self.ticket {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
