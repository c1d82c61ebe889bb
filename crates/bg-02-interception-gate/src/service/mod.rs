//! Service layer.

pub mod gate;

pub use gate::InterceptionGate;
