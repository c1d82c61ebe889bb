//! # Interception Gate
//!
//! Holds each outgoing secure connection until its destination host has
//! been verified safe from the TLS heartbeat memory-disclosure flaw.
//!
//! ## Architecture
//!
//! - **Domain Layer:** [`Host`], [`VerdictCache`], [`GateConfig`],
//!   [`GateOutcome`].
//! - **Ports Layer:** [`ConnectionHandle`] and [`ConnectionSource`] (the host
//!   application's network stack), [`VerificationDispatcher`] (the strategy).
//! - **Service Layer:** [`InterceptionGate`].
//! - **Adapters Layer:** remote verification service (feature `remote`),
//!   inline heartbeat probe (feature `local`), test doubles (feature
//!   `test-utils`).
//!
//! ## Failure handling
//!
//! Nothing the gate runs into crashes the host or strands a connection:
//!
//! | Failure                         | Result                              |
//! |---------------------------------|-------------------------------------|
//! | cannot attach / bad host        | connection untouched                |
//! | verification error or timeout   | resumed (fail-open), not cached     |
//! | shutdown during verification    | resumed                             |

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{
    CacheConfig, CancelReason, FailurePolicy, GateConfig, GateOutcome, Host, RemoteConfig,
    VerdictCache, VerificationVerdict, BINDING_ABORTED, DEFAULT_REMOTE_BASE_URL,
};
pub use error::{AttachError, DispatchError, GateConfigError, HostError};
pub use metrics::{GateStats, GateStatsSnapshot};
pub use ports::{ConnectionHandle, ConnectionSource, VerificationDispatcher};
pub use service::InterceptionGate;

#[cfg(feature = "remote")]
pub use adapters::RemoteVerifier;

#[cfg(feature = "local")]
pub use adapters::LocalProbeVerifier;
