//! Cross-crate integration tests.

pub mod probe_wire;
pub mod remote_strategy;
pub mod runtime;
