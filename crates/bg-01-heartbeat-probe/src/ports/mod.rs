//! Ports layer.

pub mod inbound;
pub mod outbound;

pub use inbound::HeartbeatProbeApi;
pub use outbound::Connector;
