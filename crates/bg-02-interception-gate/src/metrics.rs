//! Gate counters.
//!
//! One counter per terminal outcome plus the suspend and coalescing events
//! on the way there. `observed` equals the sum of the outcome counters once
//! every attempt has settled.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::GateOutcome;

/// Thread-safe gate counters.
#[derive(Debug, Default)]
pub struct GateStats {
    /// Connection attempts handed to the gate
    pub observed: AtomicU64,
    /// Attempts left untouched (non-secure scheme or gate shut down)
    pub passed_through: AtomicU64,
    /// Attempts the gate could not attach to
    pub attach_failures: AtomicU64,
    /// Cache hits with a safe verdict
    pub cache_hits_safe: AtomicU64,
    /// Cache hits with an unsafe verdict
    pub cache_hits_unsafe: AtomicU64,
    /// Attempts suspended pending verification
    pub suspended: AtomicU64,
    /// Attempts that joined a verification already in flight
    pub coalesced: AtomicU64,
    /// Suspended attempts resumed after a safe verdict
    pub resumed: AtomicU64,
    /// Suspended attempts cancelled after an unsafe verdict
    pub cancelled: AtomicU64,
    /// Suspended attempts resumed after a failed verification
    pub resumed_on_error: AtomicU64,
    /// Suspended attempts cancelled after a failed verification
    pub cancelled_on_error: AtomicU64,
    /// Suspended attempts resumed by shutdown
    pub released_on_shutdown: AtomicU64,
}

impl GateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a terminal outcome.
    pub fn record_outcome(&self, outcome: GateOutcome) {
        let counter = match outcome {
            GateOutcome::PassedThrough => &self.passed_through,
            GateOutcome::AttachFailed => &self.attach_failures,
            GateOutcome::AllowedCached => &self.cache_hits_safe,
            GateOutcome::BlockedCached => &self.cache_hits_unsafe,
            GateOutcome::Resumed => &self.resumed,
            GateOutcome::Cancelled => &self.cancelled,
            GateOutcome::ResumedOnError => &self.resumed_on_error,
            GateOutcome::CancelledOnError => &self.cancelled_on_error,
            GateOutcome::ReleasedOnShutdown => &self.released_on_shutdown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> GateStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        GateStatsSnapshot {
            observed: load(&self.observed),
            passed_through: load(&self.passed_through),
            attach_failures: load(&self.attach_failures),
            cache_hits_safe: load(&self.cache_hits_safe),
            cache_hits_unsafe: load(&self.cache_hits_unsafe),
            suspended: load(&self.suspended),
            coalesced: load(&self.coalesced),
            resumed: load(&self.resumed),
            cancelled: load(&self.cancelled),
            resumed_on_error: load(&self.resumed_on_error),
            cancelled_on_error: load(&self.cancelled_on_error),
            released_on_shutdown: load(&self.released_on_shutdown),
        }
    }
}

/// Plain copy of [`GateStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStatsSnapshot {
    pub observed: u64,
    pub passed_through: u64,
    pub attach_failures: u64,
    pub cache_hits_safe: u64,
    pub cache_hits_unsafe: u64,
    pub suspended: u64,
    pub coalesced: u64,
    pub resumed: u64,
    pub cancelled: u64,
    pub resumed_on_error: u64,
    pub cancelled_on_error: u64,
    pub released_on_shutdown: u64,
}

impl GateStatsSnapshot {
    /// Attempts that reached a terminal outcome.
    pub fn settled(&self) -> u64 {
        self.passed_through
            + self.attach_failures
            + self.cache_hits_safe
            + self.cache_hits_unsafe
            + self.resumed
            + self.cancelled
            + self.resumed_on_error
            + self.cancelled_on_error
            + self.released_on_shutdown
    }
}
