//! Test doubles: a connection that records what the gate did to it, and a
//! verifier that answers from a script.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::{CancelReason, Host};
use crate::error::{AttachError, DispatchError};
use crate::ports::{ConnectionHandle, VerificationDispatcher};

// =============================================================================
// RECORDING CONNECTION
// =============================================================================

/// Something the gate did to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Suspended,
    Resumed,
    Cancelled(CancelReason),
}

/// Connection handle that records every call.
pub struct RecordingConnection {
    scheme: String,
    host: String,
    refuse_suspend: bool,
    events: watch::Sender<Vec<ConnectionEvent>>,
}

impl RecordingConnection {
    pub fn new(scheme: &str, host: &str) -> Arc<Self> {
        Arc::new(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            refuse_suspend: false,
            events: watch::channel(Vec::new()).0,
        })
    }

    /// An `https` attempt to `host`.
    pub fn https(host: &str) -> Arc<Self> {
        Self::new("https", host)
    }

    /// A connection whose `suspend` always fails.
    pub fn refusing_suspend(scheme: &str, host: &str) -> Arc<Self> {
        Arc::new(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            refuse_suspend: true,
            events: watch::channel(Vec::new()).0,
        })
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.borrow().clone()
    }

    pub fn suspend_count(&self) -> usize {
        self.count(|e| matches!(e, ConnectionEvent::Suspended))
    }

    pub fn resume_count(&self) -> usize {
        self.count(|e| matches!(e, ConnectionEvent::Resumed))
    }

    pub fn cancel_count(&self) -> usize {
        self.count(|e| matches!(e, ConnectionEvent::Cancelled(_)))
    }

    /// Resumes plus cancels.
    pub fn release_count(&self) -> usize {
        self.resume_count() + self.cancel_count()
    }

    /// Wait until the gate has suspended this connection.
    pub async fn wait_until_suspended(&self) {
        let mut rx = self.events.subscribe();
        let _ = rx
            .wait_for(|events| events.contains(&ConnectionEvent::Suspended))
            .await;
    }

    /// Wait until the gate has resumed or cancelled this connection.
    pub async fn wait_until_released(&self) {
        let mut rx = self.events.subscribe();
        let _ = rx
            .wait_for(|events| {
                events
                    .iter()
                    .any(|e| !matches!(e, ConnectionEvent::Suspended))
            })
            .await;
    }

    fn count(&self, pred: impl Fn(&ConnectionEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: ConnectionEvent) {
        self.events.send_modify(|events| events.push(event));
    }
}

impl ConnectionHandle for RecordingConnection {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn suspend(&self) -> Result<(), AttachError> {
        if self.refuse_suspend {
            return Err(AttachError::SuspendFailed(
                "not a suspendable channel".to_string(),
            ));
        }
        self.push(ConnectionEvent::Suspended);
        Ok(())
    }

    fn resume(&self) {
        self.push(ConnectionEvent::Resumed);
    }

    fn cancel(&self, reason: CancelReason) {
        self.push(ConnectionEvent::Cancelled(reason));
    }
}

// =============================================================================
// SCRIPTED VERIFIER
// =============================================================================

/// How a [`ScriptedVerifier`] answers for one host.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer `result` after `delay`.
    Respond {
        result: Result<bool, DispatchError>,
        delay: Duration,
    },
    /// Never answer.
    Hang,
}

/// Verification dispatcher driven by a per-host script.
///
/// Unscripted hosts fail with a transport error.
pub struct ScriptedVerifier {
    script: DashMap<Host, Script>,
    calls: DashMap<Host, usize>,
    total: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self {
            script: DashMap::new(),
            calls: DashMap::new(),
            total: AtomicUsize::new(0),
        }
    }

    /// Script `host`.
    ///
    /// # Panics
    ///
    /// If `host` is not a valid host.
    pub fn with(self, host: &str, script: Script) -> Self {
        let host = Host::parse(host).expect("scripted host must be valid");
        self.script.insert(host, script);
        self
    }

    /// `host` is safe, answered after `delay`.
    pub fn safe(self, host: &str, delay: Duration) -> Self {
        self.with(host, Script::Respond { result: Ok(true), delay })
    }

    /// `host` is unsafe, answered after `delay`.
    pub fn vulnerable(self, host: &str, delay: Duration) -> Self {
        self.with(host, Script::Respond { result: Ok(false), delay })
    }

    /// Verification of `host` fails with `error` after `delay`.
    pub fn failing(self, host: &str, error: DispatchError, delay: Duration) -> Self {
        self.with(host, Script::Respond { result: Err(error), delay })
    }

    /// Verification of `host` never completes.
    pub fn hanging(self, host: &str) -> Self {
        self.with(host, Script::Hang)
    }

    /// Times `host` was verified.
    pub fn calls(&self, host: &str) -> usize {
        Host::parse(host)
            .ok()
            .and_then(|h| self.calls.get(&h).map(|n| *n))
            .unwrap_or(0)
    }

    /// Verifications of any host.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VerificationDispatcher for ScriptedVerifier {
    async fn verify(&self, host: &Host) -> Result<bool, DispatchError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.entry(host.clone()).or_insert(0) += 1;

        let script = self.script.get(host).map(|s| s.clone());
        match script {
            Some(Script::Respond { result, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            Some(Script::Hang) => std::future::pending().await,
            None => Err(DispatchError::Transport(format!("no script for {host}"))),
        }
    }

    fn strategy(&self) -> &'static str {
        "scripted"
    }
}
