//! Radiative and conductive properties of the snow-over-ice slab.
//!
//! Two-band Beer-Lambert attenuation after Patterson & Hamblin (1988):
//! shortwave is split into a visible band that penetrates ice well and a
//! near-infrared band that is absorbed close to the surface. Whatever is not
//! absorbed within the slab is conducted into the lake water below.

use li_core::Real;

/// Fraction of net shortwave in the visible band
const A_VISIBLE: Real = 0.7;
/// Fraction of net shortwave in the near-infrared band
const A_INFRARED: Real = 0.3;

/// Attenuation coefficients (1/m)
const LAMBDA_ICE_VISIBLE: Real = 1.5;
const LAMBDA_ICE_INFRARED: Real = 20.0;
const LAMBDA_SNOW_VISIBLE: Real = 6.0;
const LAMBDA_SNOW_INFRARED: Real = 20.0;

/// Thermal conductivities (W/m/K)
const K_ICE: Real = 2.24;
const K_SNOW: Real = 0.31;

/// Output of the radiative conductance helper.
#[derive(Clone, Copy, Debug, Default)]
pub struct RadiationProfile {
    /// Series thermal resistance of the snow and ice layers (m2 K/W).
    /// Zero when the slab has no thickness; consumers must not divide by it
    /// in that case.
    pub thermal_resistance: Real,
    /// Net shortwave transmitted through the slab into the water below (W/m2)
    pub sw_conducted: Real,
    /// Net shortwave absorbed within the slab, reducing its cold content
    /// (W/m2)
    pub delta_cold_content: Real,
}

/// Average thermal conductance, conducted shortwave, and cold-content change
/// for a snow layer of depth `snow_depth_m` (at new snow density) over lake
/// ice of thickness `ice_thickness_m`, under net shortwave `sw_net_w_m2`.
pub fn ice_radiation(sw_net_w_m2: Real, ice_thickness_m: Real, snow_depth_m: Real) -> RadiationProfile {
    let hi = ice_thickness_m.max(0.0);
    let hs = snow_depth_m.max(0.0);

    let thermal_resistance = hs / K_SNOW + hi / K_ICE;

    let tau_visible = (-(LAMBDA_SNOW_VISIBLE * hs + LAMBDA_ICE_VISIBLE * hi)).exp();
    let tau_infrared = (-(LAMBDA_SNOW_INFRARED * hs + LAMBDA_ICE_INFRARED * hi)).exp();

    let sw_conducted = sw_net_w_m2 * (A_VISIBLE * tau_visible + A_INFRARED * tau_infrared);
    let delta_cold_content = sw_net_w_m2 - sw_conducted;

    RadiationProfile {
        thermal_resistance,
        sw_conducted,
        delta_cold_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_thickness_transmits_everything() {
        let r = ice_radiation(100.0, 0.0, 0.0);
        assert_eq!(r.thermal_resistance, 0.0);
        assert!((r.sw_conducted - 100.0).abs() < 1e-12);
        assert!(r.delta_cold_content.abs() < 1e-12);
    }

    #[test]
    fn thick_slab_absorbs_everything() {
        let r = ice_radiation(100.0, 10.0, 5.0);
        assert!(r.sw_conducted < 1e-6);
        assert!((r.delta_cold_content - 100.0).abs() < 1e-6);
    }

    #[test]
    fn snow_attenuates_more_than_ice() {
        let bare = ice_radiation(200.0, 0.5, 0.0);
        let snowy = ice_radiation(200.0, 0.5, 0.2);
        assert!(snowy.sw_conducted < bare.sw_conducted);
        assert!(snowy.thermal_resistance > bare.thermal_resistance);
    }

    #[test]
    fn conducted_and_absorbed_sum_to_net() {
        let r = ice_radiation(150.0, 0.3, 0.1);
        assert!((r.sw_conducted + r.delta_cold_content - 150.0).abs() < 1e-9);
    }

    #[test]
    fn negative_thickness_treated_as_bare() {
        let r = ice_radiation(50.0, -0.01, -0.01);
        assert_eq!(r.thermal_resistance, 0.0);
        assert!((r.sw_conducted - 50.0).abs() < 1e-12);
    }
}
