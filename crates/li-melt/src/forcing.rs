//! Atmospheric forcing for one timestep, read-only to the melt step.

use li_core::{CoreResult, Real, ensure_finite};

/// Meteorological forcing and timestep geometry for one call.
///
/// Pressures are in Pa, precipitation in mm per timestep, the timestep
/// itself in hours.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Forcing {
    /// Timestep length (hours)
    pub dt_h: Real,
    /// Reference height of the wind/temperature measurements (m)
    pub ref_height_m: Real,
    /// Displacement height (m)
    pub displacement_m: Real,
    /// Surface roughness length (m)
    pub roughness_m: Real,
    /// Aerodynamic resistance, uncorrected for stability (s/m)
    pub aero_resist_s_m: Real,
    /// Wind speed (m/s)
    pub wind_m_s: Real,
    /// Net shortwave radiation (W/m2)
    pub sw_net_w_m2: Real,
    /// Incoming longwave radiation (W/m2)
    pub lw_in_w_m2: Real,
    /// Air density (kg/m3)
    pub air_density_kg_m3: Real,
    /// Latent heat of vaporization (J/kg)
    pub latent_heat_vap_j_kg: Real,
    /// Air temperature (C)
    pub air_temp_c: Real,
    /// Air pressure (Pa)
    pub pressure_pa: Real,
    /// Vapor pressure deficit (Pa)
    pub vpd_pa: Real,
    /// Actual vapor pressure (Pa)
    pub vp_pa: Real,
    /// Rainfall this timestep (mm)
    pub rainfall_mm: Real,
    /// Snowfall this timestep (mm water equivalent)
    pub snowfall_mm: Real,
    /// Freezing point of the lake water (C)
    pub t_cutoff_c: Real,
    /// Surface shortwave attenuation coefficient (dimensionless)
    pub surf_atten: Real,
    /// Ice-covered fraction of the previous timestep, scaling ice/volume
    /// transfers
    pub ice_fraction_prev: Real,
}

impl Forcing {
    /// Reject NaN/inf before it can poison the surface-temperature bracket.
    pub fn validate(&self) -> CoreResult<()> {
        ensure_finite(self.dt_h, "dt_h")?;
        ensure_finite(self.ref_height_m, "ref_height_m")?;
        ensure_finite(self.displacement_m, "displacement_m")?;
        ensure_finite(self.roughness_m, "roughness_m")?;
        ensure_finite(self.aero_resist_s_m, "aero_resist_s_m")?;
        ensure_finite(self.wind_m_s, "wind_m_s")?;
        ensure_finite(self.sw_net_w_m2, "sw_net_w_m2")?;
        ensure_finite(self.lw_in_w_m2, "lw_in_w_m2")?;
        ensure_finite(self.air_density_kg_m3, "air_density_kg_m3")?;
        ensure_finite(self.latent_heat_vap_j_kg, "latent_heat_vap_j_kg")?;
        ensure_finite(self.air_temp_c, "air_temp_c")?;
        ensure_finite(self.pressure_pa, "pressure_pa")?;
        ensure_finite(self.vpd_pa, "vpd_pa")?;
        ensure_finite(self.vp_pa, "vp_pa")?;
        ensure_finite(self.rainfall_mm, "rainfall_mm")?;
        ensure_finite(self.snowfall_mm, "snowfall_mm")?;
        ensure_finite(self.t_cutoff_c, "t_cutoff_c")?;
        ensure_finite(self.surf_atten, "surf_atten")?;
        ensure_finite(self.ice_fraction_prev, "ice_fraction_prev")?;
        Ok(())
    }
}
