//! Subscribable status store
//!
//! The state field, listener set and notify step shared by every session
//! role. A session embeds one `StatusStore` and routes all state writes
//! through it.

use std::sync::Arc;

use parking_lot::Mutex;

use super::listeners::ListenerSet;
use crate::session::state::{SessionState, SessionStatus};

/// Current status plus the listeners interested in it
#[derive(Debug)]
pub struct StatusStore {
    status: Mutex<Arc<SessionStatus>>,
    listeners: Arc<ListenerSet>,
}

impl StatusStore {
    /// Create a store holding an idle status for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            status: Mutex::new(Arc::new(SessionStatus::idle(id))),
            listeners: Arc::new(ListenerSet::new()),
        }
    }

    /// Current status; the same `Arc` until the state changes
    pub fn snapshot(&self) -> Arc<SessionStatus> {
        Arc::clone(&self.status.lock())
    }

    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    /// Write `state` without notifying
    ///
    /// Allocates a new status only when the state differs. Returns whether it
    /// changed.
    pub fn set(&self, state: SessionState) -> bool {
        let mut status = self.status.lock();
        if status.state == state {
            return false;
        }
        *status = Arc::new(status.with_state(state));
        true
    }

    /// Notify every listener
    pub fn notify(&self) {
        self.listeners.notify_all();
    }

    /// Write `state` and notify
    #[cfg(test)]
    pub(crate) fn publish(&self, state: SessionState) -> bool {
        let changed = self.set(state);
        self.notify();
        changed
    }

    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }
}
