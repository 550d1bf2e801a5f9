//! Stale-response guard.
//!
//! Each request takes a ticket carrying a generation number and the
//! parameters it was issued for. A result is accepted only if no newer
//! request has started and the current parameters still match.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Ticket<P> {
    generation: u64,
    params: P,
}

impl<P> Ticket<P> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> &P {
        &self.params
    }
}

pub struct StaleGuard<P> {
    generation: AtomicU64,
    current: Mutex<Option<P>>,
}

impl<P: Clone + PartialEq> Default for StaleGuard<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + PartialEq> StaleGuard<P> {
    pub fn new() -> Self {
        Self { generation: AtomicU64::new(0), current: Mutex::new(None) }
    }

    /// Start a request; every earlier ticket becomes stale.
    pub fn begin(&self, params: P) -> Ticket<P> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut current) = self.current.lock() {
            *current = Some(params.clone());
        }
        Ticket { generation, params }
    }

    pub fn is_current(&self, ticket: &Ticket<P>) -> bool {
        if self.generation.load(Ordering::SeqCst) != ticket.generation {
            return false;
        }
        self.current
            .lock()
            .map(|current| current.as_ref() == Some(&ticket.params))
            .unwrap_or(false)
    }

    /// `Some(result)` if the ticket is still current.
    pub fn accept<T>(&self, ticket: &Ticket<P>, result: T) -> Option<T> {
        self.is_current(ticket).then_some(result)
    }
}
