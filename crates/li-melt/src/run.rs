//! Drivers that apply the melt step across cells and across time.
//!
//! Cells are independent within a timestep, so `step_cells` fans the work out
//! with rayon. `run_series` walks one cell through a forcing series
//! sequentially; the state carried between steps makes the time axis
//! inherently serial.

use crate::error::{MeltError, MeltResult};
use crate::forcing::Forcing;
use crate::state::{LakeState, SnowState};
use crate::step::{BlowingSnowPolicy, MeltOutput, ice_melt_step};
use li_core::PhysConstants;
use rayon::prelude::*;

/// One grid cell: a snow pack riding on a lake.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCell {
    pub snow: SnowState,
    pub lake: LakeState,
}

/// Step every cell once, in parallel.
///
/// `forcings` pairs with `cells` element-wise. The first error encountered
/// aborts the whole batch; cells that already stepped keep their updated
/// state, so a caller that wants transactional behavior should clone first.
pub fn step_cells(
    constants: &PhysConstants,
    cells: &mut [GridCell],
    forcings: &[Forcing],
    blowing: BlowingSnowPolicy,
) -> MeltResult<Vec<MeltOutput>> {
    if cells.len() != forcings.len() {
        return Err(MeltError::InvalidArg {
            what: "one forcing record is required per cell",
        });
    }
    cells
        .par_iter_mut()
        .zip(forcings.par_iter())
        .map(|(cell, forcing)| {
            ice_melt_step(constants, forcing, &mut cell.snow, &mut cell.lake, blowing)
        })
        .collect()
}

/// Step one cell through a forcing series, collecting per-step outputs.
pub fn run_series(
    constants: &PhysConstants,
    cell: &mut GridCell,
    forcings: &[Forcing],
    blowing: BlowingSnowPolicy,
) -> MeltResult<Vec<MeltOutput>> {
    let mut outputs = Vec::with_capacity(forcings.len());
    for forcing in forcings {
        outputs.push(ice_melt_step(
            constants,
            forcing,
            &mut cell.snow,
            &mut cell.lake,
            blowing,
        )?);
    }
    Ok(outputs)
}
