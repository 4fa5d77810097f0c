//! Session configuration

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Default watchdog period
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);

/// Smallest accepted watchdog period
pub const MIN_WATCHDOG_INTERVAL: Duration = Duration::from_millis(10);

/// Default timeout for signaling and room HTTP requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default ICE server used when none is configured
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Viewer session configuration options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Origin the `/whep/{id}` and `/room/{id}` paths are resolved against
    pub base_url: Url,

    /// Period of the watchdog that restarts dead sessions
    pub watchdog_interval: Duration,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Bearer token sent with signaling requests
    pub bearer_token: Option<String>,

    /// STUN/TURN URLs handed to the transport
    pub ice_servers: Vec<String>,
}

impl SessionConfig {
    /// Create a config for the server at `base_url`
    ///
    /// Fails if the URL cannot be parsed or cannot carry a path.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bearer_token: None,
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        })
    }

    /// Set the watchdog period (at least [`MIN_WATCHDOG_INTERVAL`])
    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval.max(MIN_WATCHDOG_INTERVAL);
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Send `token` as a bearer token with signaling requests
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Replace the ICE server list
    pub fn ice_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ice_servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// URL of the WHEP resource for session `id`
    pub fn resource_url(&self, id: &str) -> Result<Url> {
        self.endpoint_url("whep", id)
    }

    /// URL of the room listing for `room_id`
    pub fn room_url(&self, room_id: &str) -> Result<Url> {
        self.endpoint_url("room", room_id)
    }

    fn endpoint_url(&self, prefix: &str, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::InvalidConfig(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(prefix)
            .push(id);
        Ok(url)
    }
}
