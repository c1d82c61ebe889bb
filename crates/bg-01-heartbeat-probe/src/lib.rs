//! # Heartbeat Probe
//!
//! Detects the TLS heartbeat memory-disclosure flaw by speaking just enough
//! of the handshake to get a heartbeat-capable peer talking, then sending a
//! heartbeat request whose declared payload is larger than what it carries.
//!
//! ## Architecture
//!
//! - **Domain Layer:** record framing, byte-exact message builders and the
//!   response classifier. Pure, no I/O.
//! - **Ports Layer:** [`HeartbeatProbeApi`] (driving) and [`Connector`]
//!   (driven).
//! - **Service Layer:** [`HeartbeatProber`], one connection per probe.
//! - **Adapters Layer:** TCP connector (feature `tcp`), in-memory connector
//!   (feature `test-utils`).
//!
//! ## Example
//!
//! ```rust
//! use bg_01_heartbeat_probe::{
//!     build_client_hello, classify_heartbeat_response, Classification, TlsVersion,
//! };
//!
//! let hello = build_client_hello(TlsVersion::Tls12);
//! assert_eq!(&hello[..3], &[0x16, 0x03, 0x03]);
//!
//! // A peer that echoes 4096 bytes for a 0-byte payload is leaking memory
//! let reply = [0x18, 0x03, 0x03, 0x10, 0x13];
//! assert_eq!(classify_heartbeat_response(0, &reply), Classification::Vulnerable);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::{Connector, HeartbeatProbeApi};
pub use service::{HeartbeatProber, ProbeSession};

#[cfg(feature = "tcp")]
pub use adapters::TcpConnector;

#[cfg(any(test, feature = "test-utils"))]
pub use adapters::MemoryConnector;
