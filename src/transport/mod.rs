//! Peer connection abstraction
//!
//! A [`Transport`] is one media connection attempt. Sessions never reuse a
//! transport across attempts: every start or restart asks the
//! [`TransportFactory`] for a fresh one and closes the previous one, because
//! peer connection implementations generally do not support renegotiating
//! after they reach a terminal state.
//!
//! ```text
//!   TransportFactory::create()
//!            │
//!            ▼
//!   add_receive_only_track(Audio)
//!   add_receive_only_track(Video)
//!   on_connection_state_change(..) ──► ViewerSession::transition
//!   on_remote_track(..)            ──► ViewerSession remote tracks
//!            │
//!            ▼
//!   create_offer() ─► SignalingExchange ─► apply_answer(sdp)
//!            │
//!            ▼
//!          close()   (exactly once, when retired)
//! ```

#[cfg(feature = "webrtc")]
pub mod peer;

#[cfg(feature = "webrtc")]
pub use peer::{PeerTransport, PeerTransportFactory};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Connection state reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A remote track delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    /// Track identifier
    pub id: String,
    /// Identifier of the media stream the track belongs to
    pub stream_id: String,
    /// Audio or video
    pub kind: TrackKind,
}

/// Callback for connection state changes
pub type ConnectionStateHandler = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Callback for remote track arrival
pub type RemoteTrackHandler = Box<dyn Fn(RemoteTrack) + Send + Sync>;

/// One peer-to-peer media connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Add a transceiver that only receives media of `kind`
    async fn add_receive_only_track(&self, kind: TrackKind) -> Result<()>;

    /// Install the connection state observer, replacing any previous one
    fn on_connection_state_change(&self, handler: ConnectionStateHandler);

    /// Install the remote track observer, replacing any previous one
    fn on_remote_track(&self, handler: RemoteTrackHandler);

    /// Create the local offer and return its SDP
    async fn create_offer(&self) -> Result<String>;

    /// Apply the remote answer SDP
    async fn apply_answer(&self, sdp: String) -> Result<()>;

    /// Stop all tracks and release the connection
    async fn close(&self) -> Result<()>;
}

/// Builds a fresh transport for each connection attempt
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn Transport>>;
}
