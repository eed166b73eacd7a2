//! Error types for root-finding operations.

use thiserror::Error;

/// Errors that can occur while searching for a residual root.
///
/// These are ordinary error values; the caller decides how to halt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error(
        "no sign change in [{lower}, {upper}] after {tries} bracket expansions \
         (f(lower) = {f_lower}, f(upper) = {f_upper})"
    )]
    BracketFailure {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
        tries: usize,
    },

    #[error("no convergence after {iterations} iterations, residual = {residual}")]
    ConvergenceFailed { iterations: usize, residual: f64 },

    #[error("residual returned a non-finite value at x = {x}")]
    NonFiniteResidual { x: f64 },
}

pub type SolverResult<T> = Result<T, SolverError>;
