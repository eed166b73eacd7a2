//! li-solver: scalar root finding for lakeice.
//!
//! Provides the bracketed Brent solver used by the melt step to find the
//! subfreezing surface temperature that closes the energy balance. The solver
//! knows nothing about the physics; it takes the residual as a closure.

pub mod brent;
pub mod error;

pub use brent::{BrentConfig, BrentResult, root_brent};
pub use error::{SolverError, SolverResult};
