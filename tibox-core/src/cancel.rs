//! Single-use cancellation handles for tip-list fetches.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Owning side of one fetch's cancellation.
///
/// Every handle carries a process-unique ticket so a resolving fetch can
/// tell whether it is still the one its box is waiting for.
#[derive(Debug)]
pub struct AbortHandle {
    ticket: u64,
    token: CancellationToken,
}

/// Observing side handed to dictionary sources.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    ticket: u64,
    token: CancellationToken,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self {
            ticket: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            ticket: self.ticket,
            token: self.token.clone(),
        }
    }

    /// Idempotent.
    pub fn abort(&self, reason: &str) {
        if !self.token.is_cancelled() {
            tracing::debug!(ticket = self.ticket, reason, "abort tip fetch");
            self.token.cancel();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the owning handle aborts.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    /// A signal that never fires, for one-off queries outside a tip fetch.
    pub fn never() -> Self {
        Self {
            ticket: 0,
            token: CancellationToken::new(),
        }
    }
}
