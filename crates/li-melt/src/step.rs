//! The ice/snow melt step: one timestep of surface energy and mass balance
//! for a lake-surface grid cell.
//!
//! Control flow: evaluate the energy-balance residual with the surface held
//! at freezing; if it closes there the surface is isothermal at 0 C and the
//! residual's refreeze term drives direct refreeze or melt accounting,
//! otherwise the surface temperature is solved below freezing with Brent's
//! method. Either way the vapor flux is then drawn through the reservoirs in
//! priority order, melt is partitioned against snow ice then lake ice, the
//! surface liquid store is capped, and a mass-balance residual is recorded.

use crate::error::{MeltError, MeltResult};
use crate::forcing::Forcing;
use crate::state::{LakeState, SnowState};
use li_core::{PhysConstants, Real, m_to_mm, mm_to_m};
use li_physics::{EnergyBalanceParams, ice_radiation, surface_energy_balance};
use li_solver::{BrentConfig, root_brent};

/// Policy for the blowing-snow sublimation term.
///
/// No blowing-snow model is built in; callers that run one feed its output
/// through `Prescribed`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BlowingSnowPolicy {
    /// No blowing-snow sublimation
    #[default]
    Disabled,
    /// Blowing-snow flux computed elsewhere (m/timestep, negative = loss)
    Prescribed(Real),
}

impl BlowingSnowPolicy {
    pub fn flux_m(&self) -> Real {
        match self {
            BlowingSnowPolicy::Disabled => 0.0,
            BlowingSnowPolicy::Prescribed(v) => *v,
        }
    }
}

/// Flux diagnostics returned to the caller for aggregation or logging.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FluxDiagnostics {
    /// Net longwave radiation (W/m2)
    pub lw_net_w_m2: Real,
    /// Energy advected by rain (W/m2)
    pub advected_energy_w_m2: Real,
    /// Shortwave absorbed within the slab (W/m2)
    pub delta_cold_content_w_m2: Real,
    /// Heat conducted up from the lake water (W/m2)
    pub ground_flux_w_m2: Real,
    /// Latent heat exchange (W/m2)
    pub latent_heat_w_m2: Real,
    /// Sensible heat exchange (W/m2)
    pub sensible_heat_w_m2: Real,
    /// Net energy at the surface (W/m2)
    pub qnet_w_m2: Real,
    /// Refreeze energy; positive = freezing (W/m2)
    pub refreeze_energy_w_m2: Real,
}

/// Output of one melt step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeltOutput {
    /// Meltwater delivered to the lake from the pack surface (mm water
    /// equivalent)
    pub surface_melt_mm: Real,
    /// Lake ice melted in place this step (m water equivalent)
    pub ice_melt_to_lake_m: Real,
    pub fluxes: FluxDiagnostics,
}

/// Advance the snow/lake-ice layer by one timestep.
///
/// `snow` and `lake` are mutated in place. Returns the melt output and flux
/// diagnostics, or [`MeltError::SurfaceTempDiverged`] carrying the full
/// parameter snapshot when the subfreezing temperature solve fails; that
/// error is unrecoverable for the run and the caller decides how to halt.
pub fn ice_melt_step(
    constants: &PhysConstants,
    forcing: &Forcing,
    snow: &mut SnowState,
    lake: &mut LakeState,
    blowing: BlowingSnowPolicy,
) -> MeltResult<MeltOutput> {
    let c = constants;
    let f = forcing;

    f.validate()?;
    if f.dt_h <= 0.0 {
        return Err(MeltError::InvalidArg {
            what: "timestep must be positive",
        });
    }
    if !(snow.surface_liquid_m >= 0.0 && snow.swe_m >= snow.surface_liquid_m) {
        return Err(MeltError::InvalidArg {
            what: "snow state requires swe_m >= surface_liquid_m >= 0",
        });
    }
    if lake.ice_thickness_m < 0.0 {
        return Err(MeltError::InvalidArg {
            what: "ice_thickness_m must be non-negative",
        });
    }
    if lake.surface_area_m2.is_empty() {
        return Err(MeltError::InvalidArg {
            what: "lake needs at least one surface sub-band",
        });
    }

    let dt_s = c.dt_seconds(f.dt_h);
    let snowfall_m = mm_to_m(f.snowfall_mm);
    let rainfall_m = mm_to_m(f.rainfall_mm);

    let initial_swe = snow.swe_m;
    let old_surf_temp = snow.surface_temp_c;

    // Single-layer pack: split the stored mass into frozen and liquid parts,
    // and express the lake ice as water equivalent
    let mut snow_ice = snow.swe_m - snow.surface_liquid_m;
    let mut lake_ice = c.ice_to_water_equivalent(lake.ice_thickness_m);
    let initial_lake_ice = lake_ice;

    // Distribute fresh precipitation
    snow_ice += snowfall_m;
    snow.surface_liquid_m += rainfall_m;

    let radiation = ice_radiation(f.sw_net_w_m2, lake.ice_thickness_m, c.snow_depth(snow_ice));

    snow.blowing_flux_m = blowing.flux_m();

    let params = EnergyBalanceParams {
        dt_h: f.dt_h,
        aero_resist_s_m: f.aero_resist_s_m,
        ref_height_m: f.ref_height_m,
        displacement_m: f.displacement_m,
        roughness_m: f.roughness_m,
        wind_m_s: f.wind_m_s,
        sw_net_w_m2: f.sw_net_w_m2,
        lw_in_w_m2: f.lw_in_w_m2,
        air_density_kg_m3: f.air_density_kg_m3,
        latent_heat_vap_j_kg: f.latent_heat_vap_j_kg,
        air_temp_c: f.air_temp_c,
        pressure_pa: f.pressure_pa,
        vpd_pa: f.vpd_pa,
        vp_pa: f.vp_pa,
        rain_m: rainfall_m,
        swe_surface_layer_m: initial_swe + lake_ice,
        surface_liquid_m: snow.surface_liquid_m,
        old_surf_temp_c: old_surf_temp,
        delta_cold_content_w_m2: radiation.delta_cold_content,
        t_cutoff_c: f.t_cutoff_c,
        thermal_resistance_m2k_w: radiation.thermal_resistance,
        sw_conducted_w_m2: radiation.sw_conducted,
        snow_depth_m: c.snow_depth(initial_swe),
        snow_density_kg_m3: c.rho_new_snow,
        surf_atten: f.surf_atten,
        blowing_flux_m: snow.blowing_flux_m,
    };

    // Surface balance with the surface held at freezing
    let at_freezing = surface_energy_balance(0.0, &params, c);
    snow.vapor_flux_m = at_freezing.fluxes.vapor_flux_m;
    snow.surface_flux_m = at_freezing.fluxes.surface_flux_m;

    let mut qnet = at_freezing.qnet_w_m2;
    let mut fluxes = at_freezing.fluxes;
    let mut melt_energy = 0.0;
    let mut ice_melt_to_lake = 0.0;

    if qnet >= 0.0 {
        // The balance closes at 0 C: isothermal surface
        snow.surface_temp_c = 0.0;
        let mut snow_melt;
        let refreeze = fluxes.refreeze_energy_w_m2;
        if refreeze >= 0.0 {
            // Net freezing of surface liquid, capped at what is there
            let mut refrozen = refreeze / (c.lf_fusion * c.rho_water) * dt_s;
            let mut refreeze_used = refreeze;
            if refrozen > snow.surface_liquid_m {
                refrozen = snow.surface_liquid_m;
                refreeze_used = refrozen * c.lf_fusion * c.rho_water / dt_s;
            }
            melt_energy += refreeze_used;
            snow_ice += refrozen;
            snow.surface_liquid_m -= refrozen;
            debug_assert!(snow.surface_liquid_m >= -1e-15);
            snow_melt = 0.0;
        } else {
            // Melt demand
            snow_melt = -refreeze / (c.lf_fusion * c.rho_water) * dt_s;
            melt_energy += refreeze;
        }

        apply_vapor_flux(snow, lake, &mut snow_ice, &mut lake_ice, true, f.ice_fraction_prev);

        ice_melt_to_lake = partition_melt(
            &mut snow_melt,
            &mut snow_ice,
            &mut lake_ice,
            &mut snow.surface_liquid_m,
        );
    } else {
        // The surface is colder than freezing: solve for its temperature
        let solve = root_brent(
            old_surf_temp - c.surf_temp_decrement,
            0.0,
            |t| surface_energy_balance(t, &params, c).qnet_w_m2,
            &BrentConfig::default(),
        )
        .map_err(|source| MeltError::SurfaceTempDiverged {
            source,
            snapshot: Box::new(params.clone()),
        })?;
        snow.surface_temp_c = solve.root;

        // Re-evaluate at the solved temperature for the final flux terms
        let resolved = surface_energy_balance(snow.surface_temp_c, &params, c);
        qnet = resolved.qnet_w_m2;
        fluxes = resolved.fluxes;
        snow.vapor_flux_m = fluxes.vapor_flux_m;
        snow.surface_flux_m = fluxes.surface_flux_m;

        // Below freezing there is no melt and all surface liquid refreezes
        snow_ice += snow.surface_liquid_m;
        melt_energy += snow.surface_liquid_m * c.lf_fusion * c.rho_water / dt_s;
        snow.surface_liquid_m = 0.0;

        apply_vapor_flux(snow, lake, &mut snow_ice, &mut lake_ice, false, f.ice_fraction_prev);
    }

    // Cap the liquid store; the overflow leaves the pack as melt
    let max_liquid = c.liquid_water_capacity * snow_ice;
    let surface_melt_m = if snow.surface_liquid_m > max_liquid {
        let excess = snow.surface_liquid_m - max_liquid;
        snow.surface_liquid_m = max_liquid;
        excess
    } else {
        0.0
    };

    // Fold the working reservoirs back into the stored state
    snow.swe_m = snow_ice + snow.surface_liquid_m;
    lake.ice_thickness_m = c.water_equivalent_to_ice(lake_ice);
    if lake.ice_thickness_m <= 0.0 {
        lake.ice_thickness_m = 0.0;
        lake.ice_fraction = 0.0;
    }
    snow.melt_energy_w_m2 = melt_energy;

    // Mass balance residual; diagnostic, not enforced
    snow.mass_balance_error_m = (initial_swe - snow.swe_m) + (initial_lake_ice - lake_ice)
        + (rainfall_m + snowfall_m)
        - ice_melt_to_lake
        - surface_melt_m
        + snow.vapor_flux_m;

    // Reporting convention: positive vapor flux = mass lost to the atmosphere
    snow.vapor_flux_m = -snow.vapor_flux_m;

    Ok(MeltOutput {
        surface_melt_mm: m_to_mm(surface_melt_m),
        ice_melt_to_lake_m: ice_melt_to_lake,
        fluxes: FluxDiagnostics {
            lw_net_w_m2: fluxes.lw_net_w_m2,
            advected_energy_w_m2: fluxes.advected_energy_w_m2,
            delta_cold_content_w_m2: radiation.delta_cold_content,
            ground_flux_w_m2: fluxes.ground_flux_w_m2,
            latent_heat_w_m2: fluxes.latent_heat_w_m2,
            sensible_heat_w_m2: fluxes.sensible_heat_w_m2,
            qnet_w_m2: qnet,
            refreeze_energy_w_m2: fluxes.refreeze_energy_w_m2,
        },
    })
}

/// Draw the vapor flux through the reservoirs in priority order.
///
/// Surface liquid goes first (isothermal branch only), then snow ice; lake
/// ice is the buffer of last resort. When lake ice is tapped, the lake sees
/// the mass move between its ice and liquid reservoirs, scaled by the
/// previous ice-covered fraction and the top sub-band area. A demand that
/// meets or exceeds everything stored clamps the fluxes to the total
/// available mass and drains both ice reservoirs; no reservoir goes
/// negative.
fn apply_vapor_flux(
    snow: &mut SnowState,
    lake: &mut LakeState,
    snow_ice: &mut Real,
    lake_ice: &mut Real,
    surface_liquid_available: bool,
    ice_fraction_prev: Real,
) {
    let liquid = if surface_liquid_available {
        snow.surface_liquid_m
    } else {
        0.0
    };
    let vf = snow.vapor_flux_m;
    let area = lake.top_area_m2();
    let available = *snow_ice + liquid + *lake_ice;

    if vf < 0.0 && available <= -vf {
        // Clamp the fluxes to what is stored; the lost lake ice shows up as
        // a lake volume change, not as vapor
        snow.blowing_flux_m *= -available / vf;
        snow.vapor_flux_m = -available;
        snow.surface_flux_m = -available - snow.blowing_flux_m;
        lake.volume_m3 -= *lake_ice * ice_fraction_prev * area;
        *lake_ice = 0.0;
        *snow_ice = 0.0;
    } else if *snow_ice + liquid < -vf && available > -vf {
        // Snow ice and liquid cannot cover it; the shortfall comes out of
        // lake ice
        *lake_ice += vf + *snow_ice;
        lake.volume_m3 += area * ice_fraction_prev * (vf + *snow_ice);
        *snow_ice = 0.0;
    } else if surface_liquid_available {
        if -vf > snow.surface_liquid_m {
            *snow_ice += vf + snow.surface_liquid_m;
            snow.surface_liquid_m = 0.0;
        } else {
            snow.surface_liquid_m += vf;
        }
    } else if *snow_ice > 0.0 {
        *snow_ice += vf;
    } else {
        // Bare ice with nothing frozen on top: deposition goes straight to
        // the lake
        lake.volume_m3 += area * ice_fraction_prev * vf;
    }
}

/// Partition melt against snow ice first, then lake ice.
///
/// Returns the lake ice melted (m water equivalent). Melt that exceeds the
/// total stored ice clamps to it.
fn partition_melt(
    snow_melt: &mut Real,
    snow_ice: &mut Real,
    lake_ice: &mut Real,
    surface_liquid: &mut Real,
) -> Real {
    if *snow_melt < *snow_ice {
        // Incomplete melting of the pack
        *surface_liquid += *snow_melt;
        *snow_ice -= *snow_melt;
        0.0
    } else if *snow_melt < *snow_ice + *lake_ice {
        // Pack gone, ice partially melted
        let ice_melt = *snow_melt - *snow_ice;
        *surface_liquid += *snow_ice;
        *lake_ice -= ice_melt;
        *snow_ice = 0.0;
        ice_melt
    } else {
        // Complete melt-through
        *snow_melt = *snow_ice + *lake_ice;
        *surface_liquid += *snow_ice;
        let ice_melt = *lake_ice;
        *snow_ice = 0.0;
        *lake_ice = 0.0;
        ice_melt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lake() -> LakeState {
        LakeState::new(0.1, 1.0, 1.0e6, vec![1.0e4]).unwrap()
    }

    fn snow_with_flux(vapor_flux_m: Real) -> SnowState {
        SnowState {
            vapor_flux_m,
            surface_flux_m: vapor_flux_m,
            ..SnowState::default()
        }
    }

    // -- partition_melt --

    #[test]
    fn partition_incomplete_pack_melt() {
        let mut melt = 0.004;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        let mut liquid = 0.001;
        let ice_melt = partition_melt(&mut melt, &mut snow_ice, &mut lake_ice, &mut liquid);
        assert_eq!(ice_melt, 0.0);
        assert!((snow_ice - 0.006).abs() < 1e-15);
        assert!((liquid - 0.005).abs() < 1e-15);
        assert_eq!(lake_ice, 0.05);
    }

    #[test]
    fn partition_melt_reaches_lake_ice() {
        let mut melt = 0.015;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        let mut liquid = 0.0;
        let ice_melt = partition_melt(&mut melt, &mut snow_ice, &mut lake_ice, &mut liquid);
        assert!((ice_melt - 0.005).abs() < 1e-15);
        assert_eq!(snow_ice, 0.0);
        assert!((lake_ice - 0.045).abs() < 1e-15);
        assert!((liquid - 0.01).abs() < 1e-15);
    }

    #[test]
    fn partition_complete_melt_through() {
        // Melt demand exceeds everything stored: clamps to the total
        let mut melt = 0.02;
        let mut snow_ice = 0.002;
        let mut lake_ice = 0.01;
        let mut liquid = 0.0;
        let ice_melt = partition_melt(&mut melt, &mut snow_ice, &mut lake_ice, &mut liquid);
        assert!((melt - 0.012).abs() < 1e-15);
        assert!((ice_melt - 0.01).abs() < 1e-15);
        assert_eq!(snow_ice, 0.0);
        assert_eq!(lake_ice, 0.0);
        assert!((liquid - 0.002).abs() < 1e-15);
    }

    // -- apply_vapor_flux --

    #[test]
    fn vapor_satisfied_by_surface_liquid() {
        let mut snow = snow_with_flux(-0.001);
        snow.surface_liquid_m = 0.003;
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 1.0);
        assert!((snow.surface_liquid_m - 0.002).abs() < 1e-15);
        assert_eq!(snow_ice, 0.01);
        assert_eq!(lake_ice, 0.05);
        assert_eq!(lake.volume_m3, v0);
    }

    #[test]
    fn vapor_falls_back_to_snow_ice() {
        let mut snow = snow_with_flux(-0.004);
        snow.surface_liquid_m = 0.001;
        let mut lake = lake();
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 1.0);
        assert_eq!(snow.surface_liquid_m, 0.0);
        assert!((snow_ice - 0.007).abs() < 1e-15);
        assert_eq!(lake_ice, 0.05);
    }

    #[test]
    fn vapor_taps_lake_ice_as_last_resort() {
        // Snow ice 0.01, lake ice 0.05, no liquid, demand 0.03: snow ice is
        // consumed and the remaining 0.02 comes from lake ice, mirrored in
        // the lake volume
        let mut snow = snow_with_flux(-0.03);
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 1.0);
        assert_eq!(snow_ice, 0.0);
        assert!((lake_ice - 0.03).abs() < 1e-15);
        assert!((lake.volume_m3 - (v0 + 1.0e4 * (-0.02))).abs() < 1e-6);
        // The flux itself was satisfiable, so it is not rescaled
        assert_eq!(snow.vapor_flux_m, -0.03);
    }

    #[test]
    fn vapor_exhausts_everything_and_clamps() {
        let mut snow = snow_with_flux(-0.1);
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 1.0);
        assert_eq!(snow_ice, 0.0);
        assert_eq!(lake_ice, 0.0);
        assert!((snow.vapor_flux_m - (-0.06)).abs() < 1e-15);
        assert!((snow.surface_flux_m - (-0.06)).abs() < 1e-15);
        assert_eq!(snow.blowing_flux_m, 0.0);
        assert!((lake.volume_m3 - (v0 - 1.0e4 * 0.05)).abs() < 1e-6);
    }

    #[test]
    fn vapor_demand_exactly_equal_to_storage_drains_cleanly() {
        // Knife edge: demand matches the total stored mass bit for bit.
        // This must take the clamp arm, not the surface-liquid arm, or
        // snow ice would go negative.
        let vf = -(0.01f64 + 0.002 + 0.05);
        let mut snow = snow_with_flux(vf);
        snow.surface_liquid_m = 0.002;
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 1.0);
        assert_eq!(snow_ice, 0.0);
        assert_eq!(lake_ice, 0.0);
        assert!((snow.vapor_flux_m - vf).abs() < 1e-15);
        assert!((lake.volume_m3 - (v0 - 1.0e4 * 0.05)).abs() < 1e-6);
    }

    #[test]
    fn subfreezing_deposition_lands_on_snow_ice() {
        let mut snow = snow_with_flux(0.002);
        let mut lake = lake();
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, false, 1.0);
        assert!((snow_ice - 0.012).abs() < 1e-15);
        assert_eq!(lake_ice, 0.05);
    }

    #[test]
    fn subfreezing_deposition_on_bare_ice_goes_to_lake() {
        let mut snow = snow_with_flux(0.002);
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.0;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, false, 0.5);
        assert_eq!(snow_ice, 0.0);
        assert_eq!(lake_ice, 0.05);
        assert!((lake.volume_m3 - (v0 + 1.0e4 * 0.5 * 0.002)).abs() < 1e-9);
    }

    #[test]
    fn ice_fraction_scales_lake_transfer() {
        let mut snow = snow_with_flux(-0.03);
        let mut lake = lake();
        let v0 = lake.volume_m3;
        let mut snow_ice = 0.01;
        let mut lake_ice = 0.05;
        apply_vapor_flux(&mut snow, &mut lake, &mut snow_ice, &mut lake_ice, true, 0.25);
        assert!((lake.volume_m3 - (v0 + 1.0e4 * 0.25 * (-0.02))).abs() < 1e-6);
    }
}
