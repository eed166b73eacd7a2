//! Prognostic state of the snow pack and the lake ice cover.
//!
//! Both structs persist across the simulation; the melt step reads the prior
//! values and mutates them in place once per timestep.

use crate::error::{MeltError, MeltResult};
use li_core::Real;

/// Single-layer snow pack riding on the lake ice.
///
/// Mass fields are water-equivalent depths in meters. Vapor fluxes use the
/// internal sign convention (negative = mass lost to the atmosphere) during
/// the step; `vapor_flux_m` is flipped to the reporting convention (positive
/// = loss) before the step returns.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SnowState {
    /// Total frozen plus liquid mass of the pack (m water equivalent)
    pub swe_m: Real,
    /// Liquid water held in the surface layer (m)
    pub surface_liquid_m: Real,
    /// Surface temperature (C); at or below 0 while ice is present, and the
    /// initial guess for the subfreezing root search
    pub surface_temp_c: Real,
    /// Total vapor mass flux for the last step (m/timestep)
    pub vapor_flux_m: Real,
    /// Blowing-snow share of the vapor flux (m/timestep)
    pub blowing_flux_m: Real,
    /// Surface share of the vapor flux (m/timestep)
    pub surface_flux_m: Real,
    /// Mass-balance residual of the last step (m); diagnostic only
    pub mass_balance_error_m: Real,
    /// Energy used for refreezing and melting during the last step (W/m2)
    pub melt_energy_w_m2: Real,
}

impl SnowState {
    /// Create a pack state, checking the mass ordering invariant.
    pub fn new(swe_m: Real, surface_liquid_m: Real, surface_temp_c: Real) -> MeltResult<Self> {
        if !(surface_liquid_m >= 0.0 && swe_m >= surface_liquid_m) {
            return Err(MeltError::InvalidArg {
                what: "snow state requires swe_m >= surface_liquid_m >= 0",
            });
        }
        Ok(Self {
            swe_m,
            surface_liquid_m,
            surface_temp_c,
            ..Self::default()
        })
    }

    /// Frozen share of the pack (m water equivalent).
    pub fn snow_ice_m(&self) -> Real {
        self.swe_m - self.surface_liquid_m
    }
}

/// Lake-side state coupled to the pack.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LakeState {
    /// Physical ice thickness (m), not water equivalent
    pub ice_thickness_m: Real,
    /// Fraction of the lake surface covered by ice (0..=1); forced to zero
    /// when the thickness collapses to zero
    pub ice_fraction: Real,
    /// Liquid lake volume (m3); adjusted when ice mass moves between the
    /// ice and liquid reservoirs
    pub volume_m3: Real,
    /// Surface area per sub-band (m2); the topmost band scales the
    /// ice/liquid volume transfers
    pub surface_area_m2: Vec<Real>,
}

impl LakeState {
    pub fn new(
        ice_thickness_m: Real,
        ice_fraction: Real,
        volume_m3: Real,
        surface_area_m2: Vec<Real>,
    ) -> MeltResult<Self> {
        if ice_thickness_m < 0.0 {
            return Err(MeltError::InvalidArg {
                what: "ice_thickness_m must be non-negative",
            });
        }
        if !(0.0..=1.0).contains(&ice_fraction) {
            return Err(MeltError::InvalidArg {
                what: "ice_fraction must be within 0..=1",
            });
        }
        if surface_area_m2.is_empty() {
            return Err(MeltError::InvalidArg {
                what: "lake needs at least one surface sub-band",
            });
        }
        Ok(Self {
            ice_thickness_m,
            ice_fraction,
            volume_m3,
            surface_area_m2,
        })
    }

    /// Area of the topmost sub-band (m2).
    pub fn top_area_m2(&self) -> Real {
        self.surface_area_m2[0]
    }
}
