//! Domain layer: hosts, verdict cache, configuration, outcomes.

pub mod cache;
pub mod config;
pub mod host;
pub mod outcome;

pub use cache::VerdictCache;
pub use config::{CacheConfig, FailurePolicy, GateConfig, RemoteConfig, DEFAULT_REMOTE_BASE_URL};
pub use host::{Host, VerificationVerdict};
pub use outcome::{CancelReason, GateOutcome, BINDING_ABORTED};
