//! # Bleed-Guard Test Suite
//!
//! Tests that cross crate boundaries: the prober against loopback servers
//! speaking just enough TLS, and the gate driving each verification
//! strategy end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support/          # Loopback fake TLS server, fake verification service
//! └── integration/
//!     ├── probe_wire.rs       # Prober over real sockets
//!     ├── local_strategy.rs   # Gate + inline probe
//!     ├── remote_strategy.rs  # Gate + HTTP verification service
//!     └── runtime.rs          # Configured runtime fed with URLs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bg-tests
//! cargo test -p bg-tests integration::probe_wire
//!
//! # Benchmarks
//! cargo bench -p bg-tests
//! ```

pub mod integration;
pub mod support;
