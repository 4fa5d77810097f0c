//! [`Transport`] over a `webrtc` peer connection

use std::sync::Arc;

use async_trait::async_trait;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

use super::{
    ConnectionState, ConnectionStateHandler, RemoteTrack, RemoteTrackHandler, TrackKind,
    Transport, TransportFactory,
};
use crate::error::{Error, Result};
use crate::session::SessionConfig;

fn transport_error(context: &str, err: webrtc::Error) -> Error {
    Error::Transport(format!("{}: {}", context, err))
}

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                ConnectionState::New
            }
            RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
            RTCPeerConnectionState::Connected => ConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectionState::Failed,
            RTCPeerConnectionState::Closed => ConnectionState::Closed,
        }
    }
}

impl From<TrackKind> for RTPCodecType {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        }
    }
}

fn remote_track(track: &TrackRemote) -> Option<RemoteTrack> {
    let kind = match track.kind() {
        RTPCodecType::Audio => TrackKind::Audio,
        RTPCodecType::Video => TrackKind::Video,
        _ => return None,
    };

    Some(RemoteTrack {
        id: track.id(),
        stream_id: track.stream_id(),
        kind,
    })
}

/// One receive-only peer connection
pub struct PeerTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl PeerTransport {
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl Transport for PeerTransport {
    async fn add_receive_only_track(&self, kind: TrackKind) -> Result<()> {
        let init = RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: vec![],
        };

        self.peer_connection
            .add_transceiver_from_kind(kind.into(), Some(init))
            .await
            .map_err(|e| transport_error("failed to add transceiver", e))?;

        Ok(())
    }

    fn on_connection_state_change(&self, handler: ConnectionStateHandler) {
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                handler(state.into());
                Box::pin(async {})
            }));
    }

    fn on_remote_track(&self, handler: RemoteTrackHandler) {
        self.peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                match remote_track(&track) {
                    Some(remote) => handler(remote),
                    None => tracing::debug!(track = %track.id(), "Ignoring track of unknown kind"),
                }
                Box::pin(async {})
            },
        ));
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| transport_error("failed to create offer", e))?;

        // Candidates go out inside the offer, so wait for gathering to finish.
        let mut gathered = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection
            .set_local_description(offer)
            .await
            .map_err(|e| transport_error("failed to set local description", e))?;
        let _ = gathered.recv().await;

        let local = self
            .peer_connection
            .local_description()
            .await
            .ok_or_else(|| Error::Transport("missing local description".into()))?;

        Ok(local.sdp)
    }

    async fn apply_answer(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)
            .map_err(|e| transport_error("invalid answer", e))?;

        self.peer_connection
            .set_remote_description(answer)
            .await
            .map_err(|e| transport_error("failed to set remote description", e))
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| transport_error("failed to close peer connection", e))
    }
}

/// Builds [`PeerTransport`]s with default codecs and interceptors
pub struct PeerTransportFactory {
    api: API,
    ice_servers: Vec<String>,
}

impl PeerTransportFactory {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| transport_error("failed to register codecs", e))?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| transport_error("failed to register interceptors", e))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            ice_servers: config.ice_servers.clone(),
        })
    }
}

#[async_trait]
impl TransportFactory for PeerTransportFactory {
    async fn create(&self) -> Result<Arc<dyn Transport>> {
        let ice_servers = if self.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = self
            .api
            .new_peer_connection(config)
            .await
            .map_err(|e| transport_error("failed to create peer connection", e))?;

        Ok(Arc::new(PeerTransport {
            peer_connection: Arc::new(peer_connection),
        }))
    }
}

impl std::fmt::Debug for PeerTransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerTransportFactory")
            .field("ice_servers", &self.ice_servers)
            .finish()
    }
}
