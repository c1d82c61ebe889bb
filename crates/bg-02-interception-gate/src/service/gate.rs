//! Interception Gate
//!
//! Per connection attempt:
//!
//! ```text
//! Observed ──► not secure ─────────────────────────────► PassedThrough
//!    │
//!    ├──► cache hit (safe) ────────────────────────────► AllowedCached
//!    ├──► cache hit (unsafe) ──► cancel ───────────────► BlockedCached
//!    └──► cache miss ──► suspend ──► verify ──┬─► safe ──► Resumed
//!                                             ├─► unsafe ► Cancelled
//!                                             └─► error ─► ResumedOnError
//!                                                          (CancelledOnError
//!                                                           when fail-closed)
//! ```
//!
//! A suspended attempt is released exactly once. Every suspended attempt
//! is registered so that `shutdown` can resume whatever is still waiting;
//! the release itself is guarded by a flag so the verification continuation
//! and shutdown never both act on the same connection.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::{CancelReason, FailurePolicy, GateConfig, GateOutcome, Host, VerdictCache};
use crate::error::{AttachError, DispatchError, GateConfigError};
use crate::metrics::{GateStats, GateStatsSnapshot};
use crate::ports::{ConnectionHandle, ConnectionSource, VerificationDispatcher};

/// Result shared between coalesced attempts; `None` until it lands.
type SharedResult = Option<Result<bool, DispatchError>>;

// =============================================================================
// SUSPENDED ATTEMPTS
// =============================================================================

enum Release {
    Resume,
    Cancel(CancelReason),
}

struct SuspendedAttempt {
    host: Host,
    handle: Arc<dyn ConnectionHandle>,
    released: AtomicBool,
}

impl SuspendedAttempt {
    /// Release the connection unless someone already did.
    fn release(&self, how: Release) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        match how {
            Release::Resume => self.handle.resume(),
            Release::Cancel(reason) => self.handle.cancel(reason),
        }
        true
    }
}

/// Keeps a suspended attempt registered while its verification runs.
///
/// Dropping the guard unregisters the attempt and resumes the connection if
/// nothing released it, so an interception future that is cancelled
/// mid-verification never strands the connection.
struct SuspensionGuard<'a> {
    registry: &'a DashMap<u64, Arc<SuspendedAttempt>>,
    id: u64,
    attempt: Arc<SuspendedAttempt>,
}

impl Drop for SuspensionGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        if self.attempt.release(Release::Resume) {
            debug!(host = %self.attempt.host, attempt = self.id, "interception dropped, resumed");
        }
    }
}

// =============================================================================
// IN-FLIGHT VERIFICATIONS
// =============================================================================

enum Role {
    Leader(Arc<watch::Sender<SharedResult>>),
    Follower(watch::Receiver<SharedResult>),
}

/// Removes the leader's in-flight marker, even if the leader is dropped
/// mid-verification. Followers then see the channel close.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<Host, Arc<watch::Sender<SharedResult>>>,
    host: &'a Host,
    sender: Arc<watch::Sender<SharedResult>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(self.host, |_, current| Arc::ptr_eq(current, &self.sender));
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Gates outgoing secure connections on a per-host safety verdict.
pub struct InterceptionGate {
    dispatcher: Arc<dyn VerificationDispatcher>,
    cache: Arc<VerdictCache>,
    config: GateConfig,
    suspended: DashMap<u64, Arc<SuspendedAttempt>>,
    in_flight: DashMap<Host, Arc<watch::Sender<SharedResult>>>,
    next_attempt_id: AtomicU64,
    shutdown: watch::Sender<bool>,
    stats: GateStats,
}

impl InterceptionGate {
    /// Create a gate. The configuration is validated.
    ///
    /// The cache is passed in so its lifetime can outlive the gate, and so
    /// that independent gates (tests) get independent caches.
    pub fn new(
        dispatcher: Arc<dyn VerificationDispatcher>,
        cache: Arc<VerdictCache>,
        config: GateConfig,
    ) -> Result<Self, GateConfigError> {
        config.validate()?;
        Ok(Self {
            dispatcher,
            cache,
            config,
            suspended: DashMap::new(),
            in_flight: DashMap::new(),
            next_attempt_id: AtomicU64::new(1),
            shutdown: watch::channel(false).0,
            stats: GateStats::new(),
        })
    }

    pub fn cache(&self) -> &Arc<VerdictCache> {
        &self.cache
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stats(&self) -> GateStatsSnapshot {
        self.stats.snapshot()
    }

    /// Attempts currently suspended.
    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Drive one connection attempt to its terminal outcome.
    ///
    /// The returned future completes when the connection has been released;
    /// it never blocks other attempts.
    #[instrument(
        name = "gate_attempt",
        skip_all,
        fields(scheme = conn.scheme(), host = conn.host())
    )]
    pub async fn handle_attempt(&self, conn: Arc<dyn ConnectionHandle>) -> GateOutcome {
        self.stats.observed.fetch_add(1, Ordering::Relaxed);
        let outcome = self.intercept(conn).await;
        self.stats.record_outcome(outcome);
        outcome
    }

    /// Handle an attempt on its own task.
    pub fn observe(self: &Arc<Self>, conn: Arc<dyn ConnectionHandle>) -> JoinHandle<GateOutcome> {
        let gate = Arc::clone(self);
        tokio::spawn(async move { gate.handle_attempt(conn).await })
    }

    /// Pull attempts from `source` until it is exhausted or `shutdown`
    /// completes. On shutdown every suspended attempt is resumed.
    ///
    /// Returns the number of attempts observed.
    pub async fn run<S, F>(self: &Arc<Self>, mut source: S, shutdown: F) -> usize
    where
        S: ConnectionSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();
        let mut observed = 0usize;

        let stopped = loop {
            tokio::select! {
                _ = &mut shutdown => break true,
                next = source.next_attempt() => match next {
                    Some(conn) => {
                        observed += 1;
                        let gate = Arc::clone(self);
                        tasks.spawn(async move { gate.handle_attempt(conn).await });
                    }
                    None => {
                        debug!("connection source exhausted");
                        break false;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "interception task failed");
                    }
                }
            }
        };

        if stopped {
            info!("shutdown requested");
            self.shutdown();
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "interception task failed");
            }
        }

        observed
    }

    /// Stop intercepting and resume every suspended attempt.
    ///
    /// Attempts observed afterwards pass through untouched. Returns the
    /// number of connections released here.
    pub fn shutdown(&self) -> usize {
        self.shutdown.send_replace(true);

        let ids: Vec<u64> = self.suspended.iter().map(|entry| *entry.key()).collect();
        let mut released = 0;
        for id in ids {
            if let Some((_, attempt)) = self.suspended.remove(&id) {
                if attempt.release(Release::Resume) {
                    debug!(host = %attempt.host, attempt = id, "resumed on shutdown");
                    released += 1;
                }
            }
        }

        info!(released, "gate shut down");
        released
    }

    async fn intercept(&self, conn: Arc<dyn ConnectionHandle>) -> GateOutcome {
        if !self.config.is_secure(conn.scheme()) {
            debug!("not a secure scheme, passing through");
            return GateOutcome::PassedThrough;
        }
        if self.is_shut_down() {
            debug!("gate shut down, passing through");
            return GateOutcome::PassedThrough;
        }

        let host = match Host::parse(conn.host()) {
            Ok(host) => host,
            Err(e) => {
                warn!(error = %AttachError::from(e), "cannot intercept connection");
                return GateOutcome::AttachFailed;
            }
        };

        match self.cache.lookup(&host) {
            Some(true) => {
                debug!("cached safe verdict");
                return GateOutcome::AllowedCached;
            }
            Some(false) => {
                info!("cached unsafe verdict, cancelling");
                conn.cancel(CancelReason::Vulnerable);
                return GateOutcome::BlockedCached;
            }
            None => {}
        }

        if let Err(e) = conn.suspend() {
            warn!(error = %e, "cannot intercept connection");
            return GateOutcome::AttachFailed;
        }
        self.stats.suspended.fetch_add(1, Ordering::Relaxed);

        let id = self.next_attempt_id.fetch_add(1, Ordering::Relaxed);
        let attempt = Arc::new(SuspendedAttempt {
            host: host.clone(),
            handle: conn,
            released: AtomicBool::new(false),
        });
        self.suspended.insert(id, Arc::clone(&attempt));
        let guard = SuspensionGuard {
            registry: &self.suspended,
            id,
            attempt,
        };
        debug!(attempt = id, "connection suspended");

        // Shutdown may have swept the registry just before the insert
        let result = if self.is_shut_down() {
            Err(DispatchError::Shutdown)
        } else {
            self.dispatch(&host).await
        };

        self.suspended.remove(&id);
        self.settle(id, &guard.attempt, result)
    }

    async fn dispatch(&self, host: &Host) -> Result<bool, DispatchError> {
        if !self.config.coalesce_in_flight {
            return self.verify_once(host).await;
        }

        match self.claim(host) {
            Role::Leader(sender) => {
                let guard = InFlightGuard {
                    in_flight: &self.in_flight,
                    host,
                    sender: Arc::clone(&sender),
                };
                let result = self.verify_once(host).await;
                sender.send_replace(Some(result.clone()));
                drop(guard);
                result
            }
            Role::Follower(mut receiver) => {
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!("joining verification already in flight");
                self.await_shared(&mut receiver).await
            }
        }
    }

    fn claim(&self, host: &Host) -> Role {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(host.clone()) {
            Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let sender = Arc::new(watch::channel(None).0);
                entry.insert(Arc::clone(&sender));
                Role::Leader(sender)
            }
        }
    }

    async fn await_shared(
        &self,
        receiver: &mut watch::Receiver<SharedResult>,
    ) -> Result<bool, DispatchError> {
        let mut shutdown = self.shutdown.subscribe();
        let shared = async {
            receiver
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|value| value.clone())
        };

        tokio::select! {
            result = shared => result.unwrap_or(Err(DispatchError::Abandoned)),
            _ = shutdown.wait_for(|down| *down) => Err(DispatchError::Shutdown),
        }
    }

    async fn verify_once(&self, host: &Host) -> Result<bool, DispatchError> {
        let mut shutdown = self.shutdown.subscribe();
        let timeout = self.config.verify_timeout;
        let strategy = self.dispatcher.strategy();
        let started = Instant::now();

        let result = tokio::select! {
            verdict = tokio::time::timeout(timeout, self.dispatcher.verify(host)) => {
                verdict.unwrap_or(Err(DispatchError::Timeout(timeout)))
            }
            _ = shutdown.wait_for(|down| *down) => Err(DispatchError::Shutdown),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(safe) => {
                self.cache.record(host, *safe);
                info!(safe = *safe, strategy, elapsed_ms, "verification complete");
            }
            Err(DispatchError::Shutdown) => {
                debug!(strategy, "verification interrupted by shutdown");
            }
            Err(e) => {
                warn!(error = %e, strategy, elapsed_ms, "verification failed, not caching");
            }
        }
        result
    }

    fn settle(
        &self,
        id: u64,
        attempt: &SuspendedAttempt,
        result: Result<bool, DispatchError>,
    ) -> GateOutcome {
        let (release, outcome) = match result {
            Ok(true) => (Release::Resume, GateOutcome::Resumed),
            Ok(false) => (
                Release::Cancel(CancelReason::Vulnerable),
                GateOutcome::Cancelled,
            ),
            Err(DispatchError::Shutdown) => (Release::Resume, GateOutcome::ReleasedOnShutdown),
            Err(_) => match self.config.failure_policy {
                FailurePolicy::FailOpen => (Release::Resume, GateOutcome::ResumedOnError),
                FailurePolicy::FailClosed => (
                    Release::Cancel(CancelReason::VerificationFailed),
                    GateOutcome::CancelledOnError,
                ),
            },
        };

        if attempt.release(release) {
            debug!(attempt = id, outcome = %outcome, "connection released");
            outcome
        } else {
            debug!(attempt = id, "connection already released by shutdown");
            GateOutcome::ReleasedOnShutdown
        }
    }
}
