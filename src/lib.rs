//! whep-viewer: self-healing WHEP viewer sessions
//!
//! Pulls live streams from a WHEP server and keeps them playing. Each stream
//! id maps to one [`ViewerSession`] owned by a [`SessionRegistry`]; a
//! watchdog restarts sessions whose handshake failed or whose connection
//! dropped, and consumers observe state through a [`SessionBridge`].
//!
//! ```text
//!   RoomClient ──join──►  SessionRegistry ──get_or_create──► ViewerSession
//!                                                              │   ▲
//!                           TransportFactory::create() ◄───────┤   │ restart()
//!                           SignalingExchange::view()  ◄───────┘   │
//!                                                               Watchdog
//!   UI ◄── subscribe / get_snapshot ── SessionBridge ◄── StatusStore
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use whep_viewer::{SessionConfig, SessionRegistry, TransportFactory, WhepConnector};
//!
//! # async fn run(transports: Arc<dyn TransportFactory>) -> whep_viewer::Result<()> {
//! let config = SessionConfig::new("http://localhost:8080")?;
//! let registry = SessionRegistry::new(
//!     config.clone(),
//!     transports,
//!     Arc::new(WhepConnector::new(&config)?),
//! );
//!
//! let bridge = registry.bridge("camera-1");
//! let _subscription = bridge.subscribe(|| {});
//! registry.get_or_create("camera-1").start().await;
//! println!("{}", bridge.get_snapshot().state);
//! # Ok(())
//! # }
//! ```
//!
//! With the `webrtc` feature, `PeerTransportFactory` provides the transports.

pub mod bridge;
pub mod error;
pub mod registry;
pub mod room;
pub mod session;
pub mod signaling;
pub mod stats;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::{SessionBridge, Subscribable, Unsubscribe};
pub use error::{Error, HandshakeError, Result};
pub use registry::SessionRegistry;
pub use room::RoomClient;
pub use session::{SessionConfig, SessionState, SessionStatus, ViewerSession};
pub use signaling::{SignalingExchange, SignalingFactory, WhepClient, WhepConnector};
pub use stats::SessionStats;
pub use transport::{ConnectionState, RemoteTrack, TrackKind, Transport, TransportFactory};

#[cfg(feature = "webrtc")]
pub use transport::{PeerTransport, PeerTransportFactory};
