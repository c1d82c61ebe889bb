//! Inbound Ports (Driving Ports)
//!
//! The API this crate offers to its callers.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Classification, ProbeTarget};

/// Heartbeat probe API (Driving Port)
///
/// One call opens exactly one connection, sends the ClientHello and the
/// malformed heartbeat request, and classifies the reply. There are no
/// retries and no errors: anything that prevents a decision is
/// [`Classification::Inconclusive`].
#[async_trait]
pub trait HeartbeatProbeApi: Send + Sync {
    /// Probe `target`, giving up after `timeout`.
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> Classification;
}
