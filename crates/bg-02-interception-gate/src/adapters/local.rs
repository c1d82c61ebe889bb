//! Local probe strategy: runs the heartbeat probe inline.

use async_trait::async_trait;
use bg_01_heartbeat_probe::{Classification, HeartbeatProbeApi, ProbeTarget};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::Host;
use crate::error::DispatchError;
use crate::ports::VerificationDispatcher;

/// Verification dispatcher backed by a [`HeartbeatProbeApi`].
///
/// Vulnerable maps to unsafe, not vulnerable to safe, and inconclusive to
/// an error: absence of proof is not a verdict.
pub struct LocalProbeVerifier {
    prober: Arc<dyn HeartbeatProbeApi>,
    port: u16,
    timeout: Duration,
}

impl LocalProbeVerifier {
    pub fn new(prober: Arc<dyn HeartbeatProbeApi>, port: u16, timeout: Duration) -> Self {
        Self {
            prober,
            port,
            timeout,
        }
    }
}

#[async_trait]
impl VerificationDispatcher for LocalProbeVerifier {
    async fn verify(&self, host: &Host) -> Result<bool, DispatchError> {
        let target = ProbeTarget::new(host.as_str(), self.port);
        match self.prober.probe(&target, self.timeout).await {
            Classification::Vulnerable => Ok(false),
            Classification::NotVulnerable => Ok(true),
            Classification::Inconclusive => Err(DispatchError::Inconclusive {
                host: host.to_string(),
            }),
        }
    }

    fn strategy(&self) -> &'static str {
        "local"
    }
}
