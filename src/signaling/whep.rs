//! WHEP signaling over HTTP
//!
//! ```text
//! Viewer                                        Server
//!   |                                             |
//!   |-- POST /whep/{id}  (application/sdp offer) ->|
//!   |<- 201 Created  Location: <resource>          |
//!   |               (application/sdp answer) ------|
//!   |                                             |
//!   |            [media flows]                    |
//!   |                                             |
//!   |-- DELETE <resource> ----------------------->|
//!   |<- 200/204 -----------------------------------|
//! ```
//!
//! The offer is sent complete (no trickle ICE), so the answer is applied in
//! one step and no PATCH requests are issued.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use url::Url;

use super::{SignalingExchange, SignalingFactory};
use crate::error::{Error, HandshakeError, Result};
use crate::session::SessionConfig;
use crate::transport::Transport;

/// Content type of WHEP offers and answers
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// WHEP client for one connection attempt
///
/// Remembers the resource URL returned by the last successful `view`.
pub struct WhepClient {
    http: reqwest::Client,
    bearer_token: Option<String>,
    resource: Mutex<Option<Url>>,
}

impl WhepClient {
    pub fn new(http: reqwest::Client, bearer_token: Option<String>) -> Self {
        Self {
            http,
            bearer_token,
            resource: Mutex::new(None),
        }
    }

    /// Resource URL of the current server-side session, if any
    pub fn resource(&self) -> Option<Url> {
        self.resource.lock().clone()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SignalingExchange for WhepClient {
    async fn view(&self, transport: &dyn Transport, url: &Url) -> Result<()> {
        let offer = transport
            .create_offer()
            .await
            .map_err(|e| HandshakeError::Sdp(format!("failed to create offer: {}", e)))?;

        let request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .header(ACCEPT, SDP_CONTENT_TYPE)
            .body(offer);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(HandshakeError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandshakeError::UnexpectedStatus(status.as_u16()).into());
        }

        let location = match response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
        {
            Some(location) => Some(url.join(location).map_err(HandshakeError::Location)?),
            None => None,
        };

        let answer = response.text().await.map_err(HandshakeError::Network)?;
        if answer.trim().is_empty() {
            return Err(HandshakeError::EmptyAnswer.into());
        }

        transport
            .apply_answer(answer)
            .await
            .map_err(|e| HandshakeError::Sdp(format!("failed to apply answer: {}", e)))?;

        tracing::debug!(
            url = %url,
            resource = ?location.as_ref().map(Url::as_str),
            "WHEP answer applied"
        );
        *self.resource.lock() = location;

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let resource = self.resource.lock().take();
        let Some(resource) = resource else {
            return Ok(());
        };

        let response = self
            .authorize(self.http.delete(resource.clone()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Teardown(status.as_u16()));
        }

        tracing::debug!(resource = %resource, "WHEP resource deleted");
        Ok(())
    }
}

/// Creates one [`WhepClient`] per attempt over a shared HTTP client
#[derive(Debug, Clone)]
pub struct WhepConnector {
    http: reqwest::Client,
    bearer_token: Option<String>,
}

impl WhepConnector {
    /// Build a connector using the timeout and token from `config`
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(http, config.bearer_token.clone()))
    }

    /// Build a connector around an existing HTTP client
    pub fn with_client(http: reqwest::Client, bearer_token: Option<String>) -> Self {
        Self { http, bearer_token }
    }
}

impl SignalingFactory for WhepConnector {
    fn create(&self, _id: &str) -> Arc<dyn SignalingExchange> {
        Arc::new(WhepClient::new(self.http.clone(), self.bearer_token.clone()))
    }
}
