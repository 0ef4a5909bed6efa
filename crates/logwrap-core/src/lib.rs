//! Logwrap Core - Shared types (errors, rotation policy, constants)

pub mod constants;
pub mod error;
pub mod policy;
pub mod units;

pub use error::{Error, Result};
pub use policy::RotationPolicy;
