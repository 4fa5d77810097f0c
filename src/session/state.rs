//! Session state values
//!
//! Tracks the observable state of a viewer session from idle through each
//! connection attempt.

use crate::transport::ConnectionState;

/// Observable lifecycle state of a viewer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, never started
    Idle,
    /// Handshake initiated for the current attempt
    Signaled,
    /// Transport created, not yet negotiating
    New,
    /// Transport negotiating connectivity
    Connecting,
    /// Media flowing
    Connected,
    /// Connectivity lost; may recover, the watchdog restarts it regardless
    Disconnected,
    /// Transport closed
    Closed,
    /// Handshake or transport failed
    Failed,
}

impl SessionState {
    /// States the watchdog restarts from
    pub const RESTARTABLE: [SessionState; 3] = [
        SessionState::Disconnected,
        SessionState::Closed,
        SessionState::Failed,
    ];

    /// Whether this state ends the current attempt without media
    pub fn is_restartable(self) -> bool {
        Self::RESTARTABLE.contains(&self)
    }

    /// Lowercase name, matching the transport's wire names
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Signaled => "signaled",
            SessionState::New => "new",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ConnectionState> for SessionState {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::New => SessionState::New,
            ConnectionState::Connecting => SessionState::Connecting,
            ConnectionState::Connected => SessionState::Connected,
            ConnectionState::Disconnected => SessionState::Disconnected,
            ConnectionState::Failed => SessionState::Failed,
            ConnectionState::Closed => SessionState::Closed,
        }
    }
}

/// Immutable snapshot of a session's status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Session (resource) identifier
    pub id: String,
    /// State at the time of the snapshot
    pub state: SessionState,
}

impl SessionStatus {
    /// Create a status for a session that has never started
    pub fn idle(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
        }
    }

    /// Copy of this status with a different state
    pub fn with_state(&self, state: SessionState) -> Self {
        Self {
            id: self.id.clone(),
            state,
        }
    }
}
