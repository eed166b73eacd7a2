//! li-melt: surface energy and mass balance of a snow-covered lake-ice layer.
//!
//! The core operation is [`ice_melt_step`]: one model timestep for one grid
//! cell, coupling an implicit surface-temperature solve to mass-conservation
//! accounting across three reservoirs (snow-pack ice, lake ice, surface
//! liquid). State structs are mutated in place; melt delivered to the lake
//! and a bundle of flux diagnostics come back to the caller.
//!
//! Provides:
//! - SnowState / LakeState / Forcing data model
//! - the melt step itself with the blowing-snow policy hook
//! - a rayon-parallel runner over independent grid cells

pub mod error;
pub mod forcing;
pub mod run;
pub mod state;
pub mod step;

// Re-exports for public API
pub use error::{MeltError, MeltResult};
pub use forcing::Forcing;
pub use run::{GridCell, run_series, step_cells};
pub use state::{LakeState, SnowState};
pub use step::{BlowingSnowPolicy, FluxDiagnostics, MeltOutput, ice_melt_step};
