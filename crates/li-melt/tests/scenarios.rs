//! End-to-end scenarios for the melt step: one forcing record in, the full
//! branch logic and reservoir accounting out.

use li_core::{PhysConstants, Tolerances, nearly_equal};
use li_melt::{BlowingSnowPolicy, Forcing, LakeState, MeltError, SnowState, ice_melt_step};

fn closed(residual_m: f64) -> bool {
    nearly_equal(residual_m, 0.0, Tolerances::default())
}

fn calm_forcing(lw_in_w_m2: f64) -> Forcing {
    Forcing {
        dt_h: 1.0,
        ref_height_m: 2.0,
        displacement_m: 0.0,
        roughness_m: 0.001,
        aero_resist_s_m: 100.0,
        wind_m_s: 0.0,
        sw_net_w_m2: 0.0,
        lw_in_w_m2,
        air_density_kg_m3: 1.2,
        latent_heat_vap_j_kg: 2.501e6,
        air_temp_c: -2.0,
        pressure_pa: 101_325.0,
        vpd_pa: 0.0,
        vp_pa: 0.0,
        rainfall_mm: 0.0,
        snowfall_mm: 0.0,
        t_cutoff_c: 0.0,
        surf_atten: 0.9,
        ice_fraction_prev: 1.0,
    }
}

fn lake(ice_thickness_m: f64) -> LakeState {
    LakeState::new(ice_thickness_m, 1.0, 1.0e6, vec![1.0e4]).unwrap()
}

#[test]
fn balanced_forcing_changes_nothing() {
    let c = PhysConstants::default();
    // Incoming longwave exactly offsets blackbody emission at 0 C; with calm
    // saturated air and the lake at its freezing point every other flux is
    // zero, so the state must come back untouched
    let lw_eq = c.stefan_boltzmann * (0.0f64 + c.kelvin).powi(4);
    let f = calm_forcing(lw_eq);

    let mut snow = SnowState::new(0.02, 0.0, 0.0).unwrap();
    let mut lake = lake(0.4);
    let before_snow = snow.clone();
    let before_lake = lake.clone();

    let out = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    assert_eq!(out.surface_melt_mm, 0.0);
    assert_eq!(out.ice_melt_to_lake_m, 0.0);
    assert_eq!(out.fluxes.qnet_w_m2, 0.0);
    assert_eq!(snow.swe_m, before_snow.swe_m);
    assert_eq!(snow.surface_liquid_m, before_snow.surface_liquid_m);
    assert_eq!(snow.surface_temp_c, 0.0);
    assert!(closed(snow.mass_balance_error_m));
    // Thickness makes a water-equivalent round trip, so allow an ulp or two
    assert!((lake.ice_thickness_m - before_lake.ice_thickness_m).abs() < 1e-12);
    assert_eq!(lake.ice_fraction, before_lake.ice_fraction);
    assert_eq!(lake.volume_m3, before_lake.volume_m3);
}

#[test]
fn radiative_deficit_cools_the_surface_below_freezing() {
    let c = PhysConstants::default();
    let f = calm_forcing(200.0);

    let mut snow = SnowState::new(0.02, 0.0, 0.0).unwrap();
    let mut lake = lake(0.5);

    let out = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    // The root lies well below the initial bracket, so the solver has to
    // expand downward before converging
    assert!(snow.surface_temp_c < -10.0);
    assert!(snow.surface_temp_c > -25.0);
    assert!(out.fluxes.qnet_w_m2.abs() < 1e-3);
    // Nothing melts below freezing
    assert_eq!(out.surface_melt_mm, 0.0);
    assert_eq!(out.ice_melt_to_lake_m, 0.0);
    assert!((snow.swe_m - 0.02).abs() < 1e-12);
    assert!((lake.ice_thickness_m - 0.5).abs() < 1e-12);
    assert!(closed(snow.mass_balance_error_m));
}

#[test]
fn small_deficit_refreezes_surface_liquid() {
    let c = PhysConstants::default();
    // ~315.6 W/m2 emitted at 0 C against 300 in: a ~15.6 W/m2 deficit that
    // the liquid store can cover by refreezing
    let f = calm_forcing(300.0);

    let mut snow = SnowState::new(0.03, 0.005, 0.0).unwrap();
    let mut lake = lake(0.4);

    let out = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    assert_eq!(snow.surface_temp_c, 0.0);
    assert!(out.fluxes.refreeze_energy_w_m2 > 0.0);
    // Refrozen mass over the hour: deficit * dt / (Lf * rho_w)
    let refrozen = 0.005 - snow.surface_liquid_m;
    assert!(refrozen > 1.5e-4 && refrozen < 1.9e-4, "refrozen = {refrozen}");
    // Internal phase change only: total pack mass is unchanged
    assert!((snow.swe_m - 0.03).abs() < 1e-12);
    assert_eq!(out.surface_melt_mm, 0.0);
    assert!(snow.melt_energy_w_m2 > 0.0);
    assert!(closed(snow.mass_balance_error_m));
}

#[test]
fn energy_surplus_melts_and_overflows_the_liquid_store() {
    let c = PhysConstants::default();
    // ~100 W/m2 surplus over blackbody emission at 0 C
    let f = calm_forcing(415.66);

    let mut snow = SnowState::new(0.01, 0.0, 0.0).unwrap();
    let mut lake = lake(0.4);

    let out = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    assert_eq!(snow.surface_temp_c, 0.0);
    assert!(out.fluxes.refreeze_energy_w_m2 < 0.0);
    // ~1.08 mm melts; the pack retains 3.5% of its frozen mass as liquid and
    // the rest drains to the lake
    assert!(
        out.surface_melt_mm > 0.7 && out.surface_melt_mm < 0.85,
        "surface_melt_mm = {}",
        out.surface_melt_mm
    );
    let snow_ice = snow.snow_ice_m();
    assert!((snow.surface_liquid_m - c.liquid_water_capacity * snow_ice).abs() < 1e-12);
    // Snow ice alone covers the melt demand; lake ice is untouched
    assert_eq!(out.ice_melt_to_lake_m, 0.0);
    assert!((lake.ice_thickness_m - 0.4).abs() < 1e-12);
    assert!(closed(snow.mass_balance_error_m));
}

#[test]
fn snowfall_accumulates_through_a_cold_step() {
    let c = PhysConstants::default();
    let mut f = calm_forcing(200.0);
    f.snowfall_mm = 2.0;

    let mut snow = SnowState::new(0.02, 0.0, 0.0).unwrap();
    let mut lake = lake(0.5);

    let out = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    assert!((snow.swe_m - 0.022).abs() < 1e-12);
    assert_eq!(out.surface_melt_mm, 0.0);
    assert!(closed(snow.mass_balance_error_m));
}

#[test]
fn rain_on_a_warm_pack_joins_the_liquid_store() {
    let c = PhysConstants::default();
    let lw_eq = c.stefan_boltzmann * (0.0f64 + c.kelvin).powi(4);
    let mut f = calm_forcing(lw_eq);
    f.air_temp_c = 0.0;
    f.rainfall_mm = 1.0;

    let mut snow = SnowState::new(0.05, 0.0, 0.0).unwrap();
    let mut lake = lake(0.4);

    ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    // 1 mm of rain, no energy imbalance and no capacity overflow at this
    // pack size: the rain is simply stored
    assert!((snow.surface_liquid_m - 0.001).abs() < 1e-12);
    assert!((snow.swe_m - 0.051).abs() < 1e-12);
    assert!(closed(snow.mass_balance_error_m));
}

#[test]
fn hopeless_energy_deficit_reports_solver_failure() {
    let c = PhysConstants::default();
    // No physical surface temperature balances this; the bracket search
    // exhausts its expansions and the step reports the failure with the
    // full parameter snapshot
    let f = calm_forcing(-1.0e6);

    let mut snow = SnowState::new(0.02, 0.0, 0.0).unwrap();
    let mut lake = lake(10.0);

    let err = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled)
        .unwrap_err();
    match &err {
        MeltError::SurfaceTempDiverged { snapshot, .. } => {
            assert_eq!(snapshot.lw_in_w_m2, -1.0e6);
        }
        other => panic!("expected SurfaceTempDiverged, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("lw_in_w_m2 = -1000000"));
}

#[test]
fn non_finite_forcing_is_rejected_up_front() {
    let c = PhysConstants::default();
    let mut f = calm_forcing(300.0);
    f.air_temp_c = f64::NAN;

    let mut snow = SnowState::new(0.02, 0.0, 0.0).unwrap();
    let before = snow.clone();
    let mut lake = lake(0.4);

    let err = ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled)
        .unwrap_err();
    assert!(err.to_string().contains("air_temp_c"));
    // Rejected before any accounting touched the state
    assert_eq!(snow, before);
}

#[test]
fn vapor_flux_sign_is_flipped_for_reporting() {
    let c = PhysConstants::default();
    // Windy, dry air below freezing: the surface sublimates
    let mut f = calm_forcing(280.0);
    f.wind_m_s = 4.0;
    f.air_temp_c = -5.0;
    f.vpd_pa = 300.0;
    f.vp_pa = 100.0;

    let mut snow = SnowState::new(0.05, 0.0, -3.0).unwrap();
    let mut lake = lake(0.5);

    ice_melt_step(&c, &f, &mut snow, &mut lake, BlowingSnowPolicy::Disabled).unwrap();

    // Internally negative (mass loss), positive in the reported state
    assert!(snow.vapor_flux_m > 0.0);
    // The surface share keeps the internal sign
    assert!(snow.surface_flux_m < 0.0);
    // The sublimated mass left the pack
    assert!(snow.swe_m < 0.05);
    assert!(closed(snow.mass_balance_error_m));
}
