//! Adapters layer.

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

#[cfg(feature = "tcp")]
pub use tcp::TcpConnector;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryConnector;
