//! li-core: stable foundation for lakeice.
//!
//! Contains:
//! - constants (physical-constant configuration threaded through the model)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod constants;
pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use constants::PhysConstants;
pub use error::{CoreError, CoreResult};
pub use numeric::*;
