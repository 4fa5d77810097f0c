//! Session registry implementation
//!
//! Owns every viewer session for the lifetime of the registry and hands out
//! shared references to them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bridge::SessionBridge;
use crate::session::{SessionConfig, ViewerSession};
use crate::signaling::SignalingFactory;
use crate::transport::TransportFactory;

/// Registry of viewer sessions keyed by resource id
///
/// Append-only: sessions are created on first lookup and never removed.
pub struct SessionRegistry {
    /// Map of resource id to session
    sessions: Mutex<HashMap<String, Arc<ViewerSession>>>,

    /// Configuration shared by every session
    config: Arc<SessionConfig>,

    transports: Arc<dyn TransportFactory>,
    signaling: Arc<dyn SignalingFactory>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(
        config: SessionConfig,
        transports: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingFactory>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config: Arc::new(config),
            transports,
            signaling,
        }
    }

    /// Get the session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Return the session for `id`, creating an idle one on first use
    ///
    /// Repeated calls with the same id return the same `Arc`.
    pub fn get_or_create(&self, id: &str) -> Arc<ViewerSession> {
        let mut sessions = self.sessions.lock();

        match sessions.entry(id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let session = ViewerSession::new(
                    id,
                    Arc::clone(&self.config),
                    Arc::clone(&self.transports),
                    Arc::clone(&self.signaling),
                );

                tracing::debug!(session = %id, "Session registered");

                Arc::clone(entry.insert(session))
            }
        }
    }

    /// Subscription bridge for the session with `id`
    pub fn bridge(&self, id: &str) -> SessionBridge {
        SessionBridge::new(self.get_or_create(id))
    }

    /// Check if a session exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Get total number of sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("base_url", &self.config.base_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::testing::{FakeExchange, FakeSignaling, FakeTransportFactory};

    fn registry() -> (SessionRegistry, Arc<FakeSignaling>, Arc<FakeTransportFactory>) {
        let config = SessionConfig::new("http://localhost:3000").unwrap();
        let transports = FakeTransportFactory::new();
        let signaling = FakeSignaling::new(FakeExchange::accepting());
        let registry = SessionRegistry::new(config, transports.clone(), signaling.clone());
        (registry, signaling, transports)
    }

    #[tokio::test]
    async fn test_get_or_create_is_identity_stable() {
        let (registry, signaling, _) = registry();

        let first = registry.get_or_create("room-1");
        let second = registry.get_or_create("room-1");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        // Exchanges are created per attempt, not per lookup
        assert!(signaling.ids().is_empty());
    }

    #[tokio::test]
    async fn test_distinct_ids_get_distinct_sessions() {
        let (registry, _, _) = registry();

        let a = registry.get_or_create("room-1");
        let b = registry.get_or_create("room-2");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.id(), "room-1");
        assert_eq!(b.id(), "room-2");
        assert!(registry.contains("room-2"));
        assert!(!registry.contains("room-3"));
    }

    #[tokio::test]
    async fn test_new_session_is_idle_without_transport() {
        let (registry, _, transports) = registry();
        assert!(registry.is_empty());

        let session = registry.get_or_create("room-1");

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_started());
        assert_eq!(transports.count(), 0);
    }

    #[tokio::test]
    async fn test_started_session_survives_lookup() {
        let (registry, signaling, transports) = registry();

        registry.get_or_create("room-1").start().await;
        let again = registry.get_or_create("room-1");

        assert!(again.is_started());
        assert_eq!(again.state(), SessionState::Signaled);
        assert_eq!(transports.count(), 1);
        assert_eq!(signaling.ids(), vec!["room-1".to_string()]);
    }

    #[tokio::test]
    async fn test_bridge_shares_registry_session() {
        let (registry, _, _) = registry();

        let bridge = registry.bridge("room-1");
        let session = registry.get_or_create("room-1");

        assert!(Arc::ptr_eq(bridge.session(), &session));
        assert!(Arc::ptr_eq(&bridge.get_snapshot(), &session.status()));
    }

    #[test]
    fn test_concurrent_lookups_create_one_session() {
        let (registry, signaling, _) = registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_create("room-1"))
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert!(signaling.ids().is_empty());
        assert_eq!(registry.len(), 1);
    }
}
