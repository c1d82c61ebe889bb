//! Outbound Ports (Driven Ports)
//!
//! What the gate needs from its host application and from a verification
//! strategy.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::{CancelReason, Host};
use crate::error::{AttachError, DispatchError};

/// One outgoing connection attempt, owned by the host's network stack.
///
/// The gate calls `suspend` at most once, and then exactly one of `resume`
/// or `cancel`.
pub trait ConnectionHandle: Send + Sync {
    /// URL scheme, e.g. `https`.
    fn scheme(&self) -> &str;

    /// Destination host as the host application sees it.
    fn host(&self) -> &str;

    /// Pause the attempt until `resume` or `cancel`.
    ///
    /// An error means the gate could not take control; the attempt is left
    /// alone.
    fn suspend(&self) -> Result<(), AttachError>;

    /// Let a suspended attempt continue.
    fn resume(&self);

    /// Abort the attempt.
    fn cancel(&self, reason: CancelReason);
}

/// Answers "is this host safe to connect to?" (Driven Port)
///
/// `Ok(true)` is safe, `Ok(false)` is unsafe. An error is not a verdict.
#[async_trait]
pub trait VerificationDispatcher: Send + Sync {
    async fn verify(&self, host: &Host) -> Result<bool, DispatchError>;

    /// Short name for logs.
    fn strategy(&self) -> &'static str {
        "custom"
    }
}

/// Stream of connection attempts from the host application.
#[async_trait]
pub trait ConnectionSource: Send {
    /// Next attempt, or `None` once the source is exhausted.
    async fn next_attempt(&mut self) -> Option<Arc<dyn ConnectionHandle>>;
}

#[async_trait]
impl ConnectionSource for mpsc::Receiver<Arc<dyn ConnectionHandle>> {
    async fn next_attempt(&mut self) -> Option<Arc<dyn ConnectionHandle>> {
        self.recv().await
    }
}

#[async_trait]
impl ConnectionSource for mpsc::UnboundedReceiver<Arc<dyn ConnectionHandle>> {
    async fn next_attempt(&mut self) -> Option<Arc<dyn ConnectionHandle>> {
        self.recv().await
    }
}
