//! Room directory
//!
//! A room is a named group of streams. The server lists the stream ids of a
//! room at `GET /room/{id}` as a JSON array of strings; joining a room opens
//! one viewer session per listed stream.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::session::{SessionConfig, ViewerSession};

/// Client for the room listing endpoint
#[derive(Debug, Clone)]
pub struct RoomClient {
    http: reqwest::Client,
    config: SessionConfig,
}

impl RoomClient {
    /// Build a client using the timeout and token from `config`
    pub fn new(config: SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: SessionConfig) -> Self {
        Self { http, config }
    }

    /// Stream ids published in `room_id`, in server order
    pub async fn streams(&self, room_id: &str) -> Result<Vec<String>> {
        let url = self.config.room_url(room_id)?;

        let mut request = self.http.get(url);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let streams = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await?;

        tracing::debug!(room = %room_id, streams = streams.len(), "Room listed");
        Ok(streams)
    }

    /// Open a session for every stream in `room_id`
    ///
    /// Sessions that are not started yet are started; their handshakes run
    /// on spawned tasks. Returns the sessions in listing order. Must be
    /// called within a Tokio runtime.
    pub async fn join(
        &self,
        registry: &SessionRegistry,
        room_id: &str,
    ) -> Result<Vec<Arc<ViewerSession>>> {
        let streams = self.streams(room_id).await?;

        let sessions: Vec<_> = streams
            .iter()
            .map(|id| {
                let session = registry.get_or_create(id);
                if !session.is_started() {
                    tokio::spawn(session.start());
                }
                session
            })
            .collect();

        tracing::info!(room = %room_id, sessions = sessions.len(), "Joined room");
        Ok(sessions)
    }
}
