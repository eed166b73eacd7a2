//! Surface energy-balance residual for the combined snow/lake-ice layer.
//!
//! `surface_energy_balance` evaluates the net energy imbalance at a trial
//! surface temperature. The melt step calls it once at 0 C to decide between
//! the isothermal and subfreezing branches, and the root solver calls it
//! repeatedly while searching for the subfreezing surface temperature. It is
//! a pure function: same inputs, same outputs, no side effects.
//!
//! All inputs travel in one explicit parameter struct shared by the direct
//! call site and the solver closure; the same struct doubles as the
//! diagnostic dump when the solve fails.

use li_core::{PhysConstants, Real};
use std::fmt;

const GRAVITY: Real = 9.81;
/// Critical bulk Richardson number for the stable branch
const RI_CRITICAL: Real = 0.2;

/// Full parameter set for one energy-balance evaluation.
///
/// `Display` renders one `name = value` line per parameter; this is the
/// diagnostic dump emitted when the subfreezing temperature solve fails.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyBalanceParams {
    /// Model timestep (hours)
    pub dt_h: Real,
    /// Aerodynamic resistance, uncorrected for stability (s/m)
    pub aero_resist_s_m: Real,
    /// Reference height (m)
    pub ref_height_m: Real,
    /// Displacement height (m)
    pub displacement_m: Real,
    /// Surface roughness length (m)
    pub roughness_m: Real,
    /// Wind speed at reference height (m/s)
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
    /// Actual vapor pressure of the air (Pa)
    pub vp_pa: Real,
    /// Rainfall this timestep (m)
    pub rain_m: Real,
    /// Water equivalent of the layer acting as thermal mass: snow pack plus
    /// lake ice (m)
    pub swe_surface_layer_m: Real,
    /// Liquid water held in the surface layer (m)
    pub surface_liquid_m: Real,
    /// Surface temperature of the previous timestep (C)
    pub old_surf_temp_c: Real,
    /// Shortwave absorbed within the slab, from the radiation helper (W/m2)
    pub delta_cold_content_w_m2: Real,
    /// Freezing point of the lake water (C)
    pub t_cutoff_c: Real,
    /// Series thermal resistance of the snow/ice slab (m2 K/W)
    pub thermal_resistance_m2k_w: Real,
    /// Shortwave conducted through the slab into the water (W/m2)
    pub sw_conducted_w_m2: Real,
    /// Snow depth at new snow density (m)
    pub snow_depth_m: Real,
    /// Density used for the snow depth conversion (kg/m3)
    pub snow_density_kg_m3: Real,
    /// Surface shortwave attenuation coefficient (dimensionless)
    pub surf_atten: Real,
    /// Blowing-snow sublimation this timestep (m), from the caller's policy
    pub blowing_flux_m: Real,
}

impl fmt::Display for EnergyBalanceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dt_h = {}", self.dt_h)?;
        writeln!(f, "aero_resist_s_m = {}", self.aero_resist_s_m)?;
        writeln!(f, "ref_height_m = {}", self.ref_height_m)?;
        writeln!(f, "displacement_m = {}", self.displacement_m)?;
        writeln!(f, "roughness_m = {}", self.roughness_m)?;
        writeln!(f, "wind_m_s = {}", self.wind_m_s)?;
        writeln!(f, "sw_net_w_m2 = {}", self.sw_net_w_m2)?;
        writeln!(f, "lw_in_w_m2 = {}", self.lw_in_w_m2)?;
        writeln!(f, "air_density_kg_m3 = {}", self.air_density_kg_m3)?;
        writeln!(f, "latent_heat_vap_j_kg = {}", self.latent_heat_vap_j_kg)?;
        writeln!(f, "air_temp_c = {}", self.air_temp_c)?;
        writeln!(f, "pressure_pa = {}", self.pressure_pa)?;
        writeln!(f, "vpd_pa = {}", self.vpd_pa)?;
        writeln!(f, "vp_pa = {}", self.vp_pa)?;
        writeln!(f, "rain_m = {}", self.rain_m)?;
        writeln!(f, "swe_surface_layer_m = {}", self.swe_surface_layer_m)?;
        writeln!(f, "surface_liquid_m = {}", self.surface_liquid_m)?;
        writeln!(f, "old_surf_temp_c = {}", self.old_surf_temp_c)?;
        writeln!(f, "delta_cold_content_w_m2 = {}", self.delta_cold_content_w_m2)?;
        writeln!(f, "t_cutoff_c = {}", self.t_cutoff_c)?;
        writeln!(f, "thermal_resistance_m2k_w = {}", self.thermal_resistance_m2k_w)?;
        writeln!(f, "sw_conducted_w_m2 = {}", self.sw_conducted_w_m2)?;
        writeln!(f, "snow_depth_m = {}", self.snow_depth_m)?;
        writeln!(f, "snow_density_kg_m3 = {}", self.snow_density_kg_m3)?;
        writeln!(f, "surf_atten = {}", self.surf_atten)?;
        write!(f, "blowing_flux_m = {}", self.blowing_flux_m)
    }
}

/// Flux terms computed alongside the residual.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceFluxes {
    /// Energy available to refreeze liquid water; positive = freezing,
    /// negative = melt demand (W/m2)
    pub refreeze_energy_w_m2: Real,
    /// Total vapor mass flux; negative = mass loss to the atmosphere
    /// (m/timestep)
    pub vapor_flux_m: Real,
    /// Blowing-snow share of the vapor flux (m/timestep)
    pub blowing_flux_m: Real,
    /// Surface share of the vapor flux (m/timestep)
    pub surface_flux_m: Real,
    /// Energy advected by rain (W/m2)
    pub advected_energy_w_m2: Real,
    /// Heat conducted up from the lake water through the slab (W/m2)
    pub ground_flux_w_m2: Real,
    /// Latent heat exchange at the surface (W/m2)
    pub latent_heat_w_m2: Real,
    /// Sensible heat exchange at the surface (W/m2)
    pub sensible_heat_w_m2: Real,
    /// Net longwave radiation (W/m2)
    pub lw_net_w_m2: Real,
}

/// Result of one residual evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyBalance {
    /// Net energy imbalance at the trial temperature (W/m2)
    pub qnet_w_m2: Real,
    pub fluxes: SurfaceFluxes,
}

/// Saturation vapor pressure (Pa) at temperature `t_c` (C), over water at or
/// above freezing, over ice below.
pub fn saturation_vapor_pressure(t_c: Real) -> Real {
    if t_c >= 0.0 {
        610.78 * (17.269 * t_c / (237.3 + t_c)).exp()
    } else {
        610.78 * (21.875 * t_c / (265.49 + t_c)).exp()
    }
}

/// Bulk Richardson number correction of the aerodynamic resistance.
///
/// Returns the multiplier applied to the neutral exchange coefficient:
/// below 1 under stable stratification, above 1 under unstable. At or beyond
/// the critical Richardson number turbulent exchange shuts off entirely.
fn stability_correction(
    ref_height_m: Real,
    displacement_m: Real,
    tsurf_c: Real,
    tair_c: Real,
    wind_m_s: Real,
    constants: &PhysConstants,
) -> Real {
    let t_avg_k = 0.5 * ((tair_c + constants.kelvin) + (tsurf_c + constants.kelvin));
    let ri = GRAVITY * (tair_c - tsurf_c) * (ref_height_m - displacement_m)
        / (t_avg_k * wind_m_s * wind_m_s);
    if ri > 0.0 {
        let ri = ri.min(RI_CRITICAL);
        let x = 1.0 - ri / RI_CRITICAL;
        x * x
    } else {
        (1.0 - 16.0 * ri).sqrt()
    }
}

/// Evaluate the surface energy balance at trial temperature `tsurf_c`.
///
/// At `tsurf_c == 0.0`, any energy surplus beyond what refreezing the surface
/// liquid can absorb is folded into a negative refreeze energy and the
/// residual is clamped to exactly zero; the melt step keys its branch
/// decision off that clamp.
pub fn surface_energy_balance(
    tsurf_c: Real,
    params: &EnergyBalanceParams,
    constants: &PhysConstants,
) -> EnergyBalance {
    let p = params;
    let c = constants;
    let dt_s = c.dt_seconds(p.dt_h);

    // Aerodynamic resistance, stability corrected; calm air shuts exchange off
    let ra_used = if p.wind_m_s > 0.0 {
        let corr = stability_correction(
            p.ref_height_m,
            p.displacement_m,
            tsurf_c,
            p.air_temp_c,
            p.wind_m_s,
            c,
        );
        if corr > 0.0 {
            (p.aero_resist_s_m / corr).min(c.huge_resist)
        } else {
            c.huge_resist
        }
    } else {
        c.huge_resist
    };

    // Net longwave
    let tsurf_k = tsurf_c + c.kelvin;
    let lw_net = p.lw_in_w_m2 - c.stefan_boltzmann * tsurf_k.powi(4);

    // Shortwave absorbed at the surface skin; the remainder of the in-slab
    // absorption warms the interior and the conducted part heats the water
    let sw_surface = p.surf_atten * p.delta_cold_content_w_m2;

    // Turbulent fluxes
    let sensible = p.air_density_kg_m3 * c.cp_air * (p.air_temp_c - tsurf_c) / ra_used;

    let es_surf = saturation_vapor_pressure(tsurf_c);
    let mut vapor_mass_flux =
        p.air_density_kg_m3 * (c.eps_molecular_ratio / p.pressure_pa) * (p.vp_pa - es_surf)
            / ra_used;
    // Saturated air cannot draw vapor off the surface
    if p.vpd_pa == 0.0 && vapor_mass_flux < 0.0 {
        vapor_mass_flux = 0.0;
    }
    let latent = if tsurf_c >= 0.0 {
        p.latent_heat_vap_j_kg * vapor_mass_flux
    } else {
        // Sublimation below freezing
        (p.latent_heat_vap_j_kg + c.lf_fusion) * vapor_mass_flux
    };

    let vapor_flux_m = vapor_mass_flux * dt_s / c.rho_water;
    let surface_flux_m = vapor_flux_m - p.blowing_flux_m;

    // Energy advected by rain
    let advected = c.ch_water * p.air_temp_c * p.rain_m / dt_s;

    // Conduction from the lake water through the slab
    let ground_flux = if p.thermal_resistance_m2k_w > 0.0 {
        (p.t_cutoff_c - tsurf_c) / p.thermal_resistance_m2k_w
    } else {
        0.0
    };

    let rest_term = sw_surface + lw_net + sensible + latent + advected + ground_flux;

    // Energy released if the whole surface liquid store froze this timestep
    let refreeze_potential = p.surface_liquid_m * c.lf_fusion * c.rho_water / dt_s;

    let (qnet, refreeze_energy) = if tsurf_c == 0.0 && rest_term > -refreeze_potential {
        // Isothermal surface: the surplus becomes melt demand
        (0.0, -rest_term)
    } else {
        (rest_term + refreeze_potential, refreeze_potential)
    };

    EnergyBalance {
        qnet_w_m2: qnet,
        fluxes: SurfaceFluxes {
            refreeze_energy_w_m2: refreeze_energy,
            vapor_flux_m,
            blowing_flux_m: p.blowing_flux_m,
            surface_flux_m,
            advected_energy_w_m2: advected,
            ground_flux_w_m2: ground_flux,
            latent_heat_w_m2: latent,
            sensible_heat_w_m2: sensible,
            lw_net_w_m2: lw_net,
        },
    }
}
