//! Outbound Ports (Driven Ports)
//!
//! Transport the prober needs from its host.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::{ProbeError, ProbeTarget};

/// Opens byte streams to probe targets.
///
/// The TCP adapter is the production implementation; tests hand out
/// in-memory duplex streams wired to a scripted peer.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `target` within `timeout`.
    async fn connect(&self, target: &ProbeTarget, timeout: Duration)
        -> Result<Self::Stream, ProbeError>;
}
