//! Service layer.

pub mod prober;

pub use prober::{HeartbeatProber, ProbeSession};
