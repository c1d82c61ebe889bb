//! Adapters layer: verification strategies and test doubles.

#[cfg(feature = "remote")]
pub mod remote;

#[cfg(feature = "local")]
pub mod local;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(feature = "remote")]
pub use remote::RemoteVerifier;

#[cfg(feature = "local")]
pub use local::LocalProbeVerifier;
