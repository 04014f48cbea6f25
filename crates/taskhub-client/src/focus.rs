//! Refresh-on-focus without stale writes.
//!
//! A screen owns a [`FocusScope`] and calls [`focus`](FocusScope::focus) each
//! time it becomes visible. A fetch started through [`run`](FocusScope::run)
//! only hands back its result if the scope is still focused on the same
//! visit when the response arrives.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTicket(u64);

#[derive(Debug, Default)]
pub struct FocusScope {
    generation: AtomicU64,
    focused: AtomicBool,
}

impl FocusScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen became visible. Outstanding tickets are invalidated.
    pub fn focus(&self) -> FocusTicket {
        self.focused.store(true, Ordering::Release);
        FocusTicket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The screen went away. Outstanding tickets are invalidated.
    pub fn blur(&self) {
        self.focused.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::Acquire)
    }

    pub fn ticket(&self) -> FocusTicket {
        FocusTicket(self.generation.load(Ordering::Acquire))
    }

    pub fn is_current(&self, ticket: FocusTicket) -> bool {
        self.is_focused() && self.ticket() == ticket
    }

    /// Await `fut` and return its output, or `None` if focus was lost or
    /// renewed in the meantime.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let ticket = self.ticket();
        let output = fut.await;
        if self.is_current(ticket) {
            Some(output)
        } else {
            debug!("discarding result fetched for a previous focus");
            None
        }
    }
}
