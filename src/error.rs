//! Error types
//!
//! Nothing in the session lifecycle surfaces these to callers of `start()` or
//! `stop()`; they are converted into session state and log events. They are
//! returned from the lower-level adapters (transport, signaling, room) and
//! from configuration.

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the viewer's collaborators
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SDP offer/answer negotiation failed
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Peer connection primitive reported an error
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid configuration parameter
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Server resource teardown was rejected
    #[error("teardown rejected with HTTP {0}")]
    Teardown(u16),

    /// HTTP request error outside of the handshake
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL could not be parsed or resolved
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Reasons a signaling exchange can fail
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// Request never produced a response
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Server answered 2xx without an SDP body
    #[error("empty SDP answer")]
    EmptyAnswer,

    /// Offer could not be produced or answer could not be applied
    #[error("SDP error: {0}")]
    Sdp(String),

    /// `Location` header was not a valid URL reference
    #[error("invalid resource location: {0}")]
    Location(#[source] url::ParseError),
}

impl Error {
    /// Whether this error came out of the offer/answer negotiation
    pub fn is_handshake(&self) -> bool {
        matches!(self, Error::Handshake(_))
    }
}
