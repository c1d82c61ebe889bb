//! Verdict Cache
//!
//! Per-host memo of completed verifications. Presence means a definitive
//! prior verdict; absence means the host must be checked. Only completed
//! verifications are recorded, never failures.
//!
//! Unbounded and non-expiring by default. [`CacheConfig`] can bound it
//! (least recently used host evicted first) and give entries a lifetime.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::host::{Host, VerificationVerdict};
use crate::error::GateConfigError;

#[derive(Debug, Clone, Copy)]
struct Entry {
    safe: bool,
    recorded_at: Instant,
}

/// Thread-safe per-host verdict cache.
///
/// Every operation takes one short lock, so reads and writes are atomic
/// per key.
pub struct VerdictCache {
    entries: Mutex<LruCache<Host, Entry>>,
    ttl: Option<Duration>,
}

impl VerdictCache {
    /// Unbounded cache without expiry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            ttl: None,
        }
    }

    /// Cache with the limits in `config`.
    pub fn with_config(config: &CacheConfig) -> Result<Self, GateConfigError> {
        config.validate()?;
        let entries = match config.max_entries {
            Some(max) => {
                let cap = NonZeroUsize::new(max).ok_or(GateConfigError::ZeroCacheCapacity)?;
                LruCache::new(cap)
            }
            None => LruCache::unbounded(),
        };
        Ok(Self {
            entries: Mutex::new(entries),
            ttl: config.ttl,
        })
    }

    /// Prior verdict for `host`, if any.
    pub fn lookup(&self, host: &Host) -> Option<bool> {
        let mut entries = self.entries.lock();
        let entry = *entries.get(host)?;
        if self.is_expired(&entry) {
            entries.pop(host);
            debug!(host = %host, "cached verdict expired");
            return None;
        }
        Some(entry.safe)
    }

    /// Record a verdict. Last write wins.
    pub fn record(&self, host: &Host, safe: bool) {
        let entry = Entry {
            safe,
            recorded_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.lock().push(host.clone(), entry) {
            if &evicted != host {
                debug!(host = %evicted, "evicted cached verdict");
            }
        }
    }

    /// Forget the verdict for `host`, returning it if there was one.
    pub fn invalidate(&self, host: &Host) -> Option<bool> {
        self.entries.lock().pop(host).map(|entry| entry.safe)
    }

    /// Forget every verdict.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored verdicts, including any not yet found expired.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live verdicts, most recently used first.
    pub fn snapshot(&self) -> Vec<VerificationVerdict> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry))
            .map(|(host, entry)| VerificationVerdict::new(host.clone(), entry.safe))
            .collect()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.recorded_at.elapsed() >= ttl)
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new()
    }
}
