//! Subscription bridge for rendering layers
//!
//! Exposes a session through the observable-store contract most UI layers
//! integrate with: register a no-argument change callback, then pull an
//! immutable snapshot.
//!
//! ```text
//!   ViewerSession ── StatusStore ──┬── status: Arc<SessionStatus>
//!                                  └── listeners: ListenerSet
//!                                            ▲
//!   SessionBridge::subscribe(cb) ────────────┘  ──► Unsubscribe
//!   SessionBridge::get_snapshot() ──► Arc<SessionStatus>
//! ```
//!
//! Snapshots are shared `Arc`s and only replaced when the state changes, so
//! consumers can use `Arc::ptr_eq` to detect changes.

pub mod listeners;
pub mod store;

pub use listeners::{Listener, ListenerId, ListenerSet};
pub use store::StatusStore;

use std::sync::{Arc, Weak};

use crate::session::state::SessionStatus;
use crate::session::ViewerSession;

/// A session role that publishes status through a [`StatusStore`]
pub trait Subscribable: Send + Sync {
    fn store(&self) -> &StatusStore;
}

/// Pub/sub view of one session
pub struct SessionBridge<S: Subscribable = ViewerSession> {
    session: Arc<S>,
}

impl<S: Subscribable> SessionBridge<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self { session }
    }

    /// Register `callback` for every notification of the session
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listeners = self.session.store().listeners();
        let id = listeners.add(Arc::new(callback));
        Unsubscribe {
            listeners: Arc::downgrade(listeners),
            id,
        }
    }

    /// Current immutable status
    pub fn get_snapshot(&self) -> Arc<SessionStatus> {
        self.session.store().snapshot()
    }

    /// The session behind this bridge
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }
}

impl<S: Subscribable> Clone for SessionBridge<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

/// Deregisters a callback registered through [`SessionBridge::subscribe`]
///
/// Dropping it leaves the callback registered.
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    listeners: Weak<ListenerSet>,
    id: ListenerId,
}

impl Unsubscribe {
    /// Remove the callback; later calls do nothing
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}
