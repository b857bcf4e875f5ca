//! Debounce - Cancel-and-Reschedule Timer Handle
//!
//! Purely cooperative: the owner passes in the current time and asks whether
//! the pending ticket is due. Scheduling again replaces the pending ticket, so
//! a burst of changes fires once, after the last one.

use std::time::{Duration, Instant};

/// Identifies one scheduled regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: Ticket,
    deadline: Instant,
}

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
    issued: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            issued: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a run `delay` after `now`, superseding any pending one.
    pub fn schedule(&mut self, now: Instant) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        if let Some(previous) = self.pending.replace(Pending {
            ticket,
            deadline: now + self.delay,
        }) {
            tracing::trace!("Ticket {:?} superseded by {:?}", previous.ticket, ticket);
        }
        ticket
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Take the pending ticket if its deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> Option<Ticket> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                Some(p.ticket)
            }
            _ => None,
        }
    }
}
