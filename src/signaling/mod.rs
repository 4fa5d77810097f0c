//! Signaling exchange
//!
//! The exchange negotiates a [`Transport`] against a per-resource URL. A
//! session asks its [`SignalingFactory`] for a new exchange on every attempt;
//! the exchange remembers the server resource created by its `view` so that
//! `stop` can tear it down.

pub mod whep;

pub use whep::{WhepClient, WhepConnector};

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::transport::Transport;

/// Offer/answer negotiation over HTTP
#[async_trait]
pub trait SignalingExchange: Send + Sync {
    /// Offer `transport` to the resource at `url` and apply the answer
    ///
    /// Any failure is reported as [`crate::Error::Handshake`].
    async fn view(&self, transport: &dyn Transport, url: &Url) -> Result<()>;

    /// Tear down the server resource created by the last `view`
    ///
    /// Succeeds without doing anything if no resource exists.
    async fn stop(&self) -> Result<()>;
}

/// Creates the exchange for one connection attempt of session `id`
pub trait SignalingFactory: Send + Sync {
    fn create(&self, id: &str) -> Arc<dyn SignalingExchange>;
}
