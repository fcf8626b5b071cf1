use std::sync::atomic::{AtomicU64, Ordering};

/// Tag handed out when an async operation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic generation counter. A completion is applied only while its
/// ticket is still the latest one issued; anything older is stale.
#[derive(Debug, Default)]
pub struct Sequence {
    latest: AtomicU64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Supersede every outstanding ticket without starting new work.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}
