//! Ports layer.

pub mod outbound;

pub use outbound::{ConnectionHandle, ConnectionSource, VerificationDispatcher};
