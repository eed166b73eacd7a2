//! Physical constants threaded through the model as an explicit value.
//!
//! A plain immutable struct rather than process-wide globals, so the core
//! stays free of hidden state and a test can run with modified densities or
//! capacities.

use crate::numeric::Real;

/// Process-wide physical constants and fixed model policies.
///
/// `Default` carries the standard values for fresh water and lake ice.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysConstants {
    /// Density of water (kg/m3)
    pub rho_water: Real,
    /// Density of lake ice (kg/m3)
    pub rho_ice: Real,
    /// Density of new snow, used for depth conversions (kg/m3)
    pub rho_new_snow: Real,
    /// Latent heat of fusion (J/kg)
    pub lf_fusion: Real,
    /// Specific heat of air at constant pressure (J/kg/K)
    pub cp_air: Real,
    /// Volumetric heat capacity of water (J/m3/K), for rain advection
    pub ch_water: Real,
    /// Ratio of molecular weights of water vapor and dry air
    pub eps_molecular_ratio: Real,
    /// Stefan-Boltzmann constant (W/m2/K4)
    pub stefan_boltzmann: Real,
    /// 0 C in kelvin
    pub kelvin: Real,
    /// Seconds per hour
    pub sec_per_hour: Real,
    /// Maximum liquid water the pack holds, as a fraction of snow ice mass
    pub liquid_water_capacity: Real,
    /// Offset below the previous surface temperature used to seed the
    /// subfreezing root search (C)
    pub surf_temp_decrement: Real,
    /// Aerodynamic resistance substituted under calm wind (s/m)
    pub huge_resist: Real,
}

impl Default for PhysConstants {
    fn default() -> Self {
        Self {
            rho_water: 1000.0,
            rho_ice: 917.0,
            rho_new_snow: 250.0,
            lf_fusion: 3.337e5,
            cp_air: 1004.0,
            ch_water: 4.186_8e6,
            eps_molecular_ratio: 0.622,
            stefan_boltzmann: 5.669_6e-8,
            kelvin: 273.15,
            sec_per_hour: 3600.0,
            liquid_water_capacity: 0.035,
            surf_temp_decrement: 5.0,
            huge_resist: 1e20,
        }
    }
}

impl PhysConstants {
    /// Timestep length in seconds for a timestep given in hours.
    #[inline]
    pub fn dt_seconds(&self, dt_hours: Real) -> Real {
        dt_hours * self.sec_per_hour
    }

    /// Water-equivalent depth (m) of an ice layer of the given thickness (m).
    #[inline]
    pub fn ice_to_water_equivalent(&self, thickness_m: Real) -> Real {
        thickness_m * self.rho_ice / self.rho_water
    }

    /// Physical ice thickness (m) holding the given water-equivalent depth (m).
    #[inline]
    pub fn water_equivalent_to_ice(&self, we_m: Real) -> Real {
        we_m * self.rho_water / self.rho_ice
    }

    /// Snow depth (m) of a layer with the given water equivalent (m), at new
    /// snow density.
    #[inline]
    pub fn snow_depth(&self, we_m: Real) -> Real {
        we_m * self.rho_water / self.rho_new_snow
    }
}
