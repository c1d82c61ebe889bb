//! Loopback stand-ins for the outside world.

pub mod tls_server;
pub mod verification_service;

pub use tls_server::{FakeTlsServer, ServerBehaviour};
pub use verification_service::FakeVerificationService;
