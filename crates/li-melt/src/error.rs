//! Error types for the melt step.

use li_core::CoreError;
use li_physics::EnergyBalanceParams;
use li_solver::SolverError;
use thiserror::Error;

/// Errors encountered while stepping the snow/ice layer.
#[derive(Error, Debug)]
pub enum MeltError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Non-finite forcing or state rejected before it reaches the solver.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The subfreezing surface-temperature solve did not converge.
    ///
    /// This reflects a violated single-root assumption, typically near
    /// mass or energy extrema; it is unrecoverable for the current run.
    /// The full parameter snapshot rides along so the caller can log it
    /// before halting.
    #[error(
        "surface temperature solve failed to converge ({source}); \
         check for invalid forcing values.\n{snapshot}"
    )]
    SurfaceTempDiverged {
        source: SolverError,
        snapshot: Box<EnergyBalanceParams>,
    },
}

pub type MeltResult<T> = Result<T, MeltError>;
