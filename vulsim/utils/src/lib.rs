//! Shared utilities for the VulSim compiler.
mod diagnostics;
mod errors;
mod id;

pub use diagnostics::{Diagnostics, Warning};
pub use errors::{Error, ErrorKind, VulResult};
pub use id::{GetName, Id};
