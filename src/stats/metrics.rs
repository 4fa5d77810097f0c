//! Statistics for viewer sessions

use std::time::{Duration, Instant};

use crate::session::state::SessionState;

/// Session-level counters
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Connection attempts begun (starts plus restarts)
    pub attempts: u64,
    /// Attempts begun by `restart()`
    pub restarts: u64,
    /// Attempts that ended in a failed handshake or transport setup
    pub handshake_failures: u64,
    /// State changes observed
    pub transitions: u64,
    /// When the session was first started
    pub started_at: Option<Instant>,
    /// When the session last reached `Connected`
    pub last_connected_at: Option<Instant>,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the beginning of an attempt
    pub fn on_attempt(&mut self, is_restart: bool) {
        self.attempts += 1;
        if is_restart {
            self.restarts += 1;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Record a state change
    pub fn on_transition(&mut self, state: SessionState) {
        self.transitions += 1;
        if state == SessionState::Connected {
            self.last_connected_at = Some(Instant::now());
        }
    }

    /// Record a failed attempt
    pub fn on_handshake_failure(&mut self) {
        self.handshake_failures += 1;
    }

    /// Time since the last `Connected` transition
    pub fn since_connected(&self) -> Option<Duration> {
        self.last_connected_at.map(|t| t.elapsed())
    }

    /// Time since the first start
    pub fn uptime(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}
