//! Viewer session management
//!
//! A session pulls one remote stream over WHEP and keeps pulling it: failed
//! handshakes and dropped connections are retried by a watchdog until the
//! session is stopped.

pub mod config;
pub mod state;
pub mod viewer;
pub mod watchdog;

pub use config::SessionConfig;
pub use state::{SessionState, SessionStatus};
pub use viewer::ViewerSession;
pub use watchdog::Watchdog;
