//! Terminal outcomes of one intercepted connection attempt.

use serde::Serialize;
use std::fmt;

/// Status code passed to the host when a connection is aborted.
pub const BINDING_ABORTED: u32 = 0x804B_0002;

/// Why the gate cancelled a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelReason {
    /// The host is known to be vulnerable.
    Vulnerable,
    /// Verification failed under a fail-closed policy.
    VerificationFailed,
}

impl CancelReason {
    /// Abort code handed to the host's network stack, whatever the reason.
    pub const ABORT_CODE: u32 = BINDING_ABORTED;
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vulnerable => f.write_str("vulnerable"),
            Self::VerificationFailed => f.write_str("verification-failed"),
        }
    }
}

/// Terminal state reached by one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateOutcome {
    /// Not a secure scheme, or the gate is shut down; untouched.
    PassedThrough,
    /// Could not attach to the connection; untouched.
    AttachFailed,
    /// Cached safe verdict; untouched.
    AllowedCached,
    /// Cached unsafe verdict; cancelled without suspension.
    BlockedCached,
    /// Verified safe; resumed.
    Resumed,
    /// Verified unsafe; cancelled.
    Cancelled,
    /// Verification failed; resumed (fail-open).
    ResumedOnError,
    /// Verification failed; cancelled (fail-closed).
    CancelledOnError,
    /// Resumed because the gate shut down mid-verification.
    ReleasedOnShutdown,
}

impl GateOutcome {
    /// Whether the connection was allowed to proceed.
    pub fn allowed(self) -> bool {
        !matches!(
            self,
            Self::BlockedCached | Self::Cancelled | Self::CancelledOnError
        )
    }

    /// Whether the connection was suspended on the way to this outcome.
    pub fn was_suspended(self) -> bool {
        matches!(
            self,
            Self::Resumed
                | Self::Cancelled
                | Self::ResumedOnError
                | Self::CancelledOnError
                | Self::ReleasedOnShutdown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassedThrough => "passed-through",
            Self::AttachFailed => "attach-failed",
            Self::AllowedCached => "allowed-cached",
            Self::BlockedCached => "blocked-cached",
            Self::Resumed => "resumed",
            Self::Cancelled => "cancelled",
            Self::ResumedOnError => "resumed-on-error",
            Self::CancelledOnError => "cancelled-on-error",
            Self::ReleasedOnShutdown => "released-on-shutdown",
        }
    }
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
