//! Backends for the VulSim compiler.
mod cpp;
mod traits;

pub use cpp::CppBackend;
pub use traits::{Backend, OutputUnit};
