//! li-physics: closed-form surface physics for lakeice.
//!
//! Provides:
//! - radiative transfer through the snow-over-ice slab (radiation)
//! - the surface energy-balance residual evaluated at a trial surface
//!   temperature (energy_balance)
//!
//! Both are pure functions of their inputs; the melt step and the root solver
//! call them repeatedly without side effects.

pub mod energy_balance;
pub mod radiation;

pub use energy_balance::{
    EnergyBalance, EnergyBalanceParams, SurfaceFluxes, saturation_vapor_pressure,
    surface_energy_balance,
};
pub use radiation::{RadiationProfile, ice_radiation};
