//! Impact-effect engine.
//!
//! A pure function from [`ImpactParameters`] to [`ImpactEffectResult`]: no
//! I/O, no shared state, identical inputs give bit-identical outputs. The
//! only iterative piece is the overpressure solve in [`blast`], which falls
//! back to a closed form instead of failing.

pub mod blast;
pub mod scaling;

use tracing::debug;

use crate::types::result::{
    ImpactEffectResult, CALCULATION_METHOD, CALCULATION_VERSION, DEFAULT_ASTEROID_DENSITY,
};

pub use crate::types::result::ImpactParameters;

/// Physical constants and reference tables.
pub mod constants {
    /// Joules per megaton of TNT.
    pub const JOULES_PER_MEGATON: f64 = 4.184e15;
    /// Joules per kiloton of TNT.
    pub const JOULES_PER_KILOTON: f64 = 4.184e12;
    /// Pascals per psi.
    pub const PSI_TO_PA: f64 = 6894.76;
    /// Target melt energy used by the crater scaling law (J/kg).
    pub const MELT_ENERGY_J_KG: f64 = 2.5e6;
    /// Overpressure thresholds in increasing order (psi).
    pub const OVERPRESSURE_THRESHOLDS_PSI: [f64; 4] = [1.0, 2.5, 5.0, 15.0];
    /// Distances at which shaking and wave height are reported (km).
    pub const REFERENCE_DISTANCES_KM: [f64; 5] = [10.0, 50.0, 100.0, 500.0, 1000.0];
    /// Wave heights are never reported below this (m).
    pub const MIN_WAVE_HEIGHT_M: f64 = 0.1;
    /// Reference events for order-of-magnitude comparison (J).
    pub const HISTORICAL_EVENTS: [(&str, f64); 4] = [
        ("Hiroshima", 6.3e13),
        ("Tunguska", 3.0e15),
        ("Tsar Bomba", 2.1e17),
        ("Chicxulub", 1.3e23),
    ];
}

/// Runs the scaling laws and the blast solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEngine {
    asteroid_density_kg_m3: f64,
}

impl Default for ImpactEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ASTEROID_DENSITY)
    }
}

impl ImpactEngine {
    /// Engine whose convenience helpers assume the given impactor density.
    pub fn new(asteroid_density_kg_m3: f64) -> Self {
        Self {
            asteroid_density_kg_m3,
        }
    }

    /// Impactor density (kg/m³) used when none is given per call.
    pub fn asteroid_density_kg_m3(&self) -> f64 {
        self.asteroid_density_kg_m3
    }

    /// Kinetic energy (J) of an impactor at the configured density.
    pub fn estimate_energy(&self, diameter_m: f64, velocity_ms: f64) -> f64 {
        scaling::kinetic_energy(diameter_m, velocity_ms, self.asteroid_density_kg_m3)
    }

    /// Compute every effect for one impact.
    ///
    /// Never fails; inputs are expected to be positive and finite.
    pub fn compute(&self, params: &ImpactParameters) -> ImpactEffectResult {
        let energy = scaling::energy(params);
        let ke = energy.joules;

        let crater = scaling::crater(params, ke);
        let airblast = blast::airblast(ke);
        let damage_zones = blast::damage_zones(&airblast);
        let earthquake = scaling::earthquake(ke);
        let thermal = scaling::thermal(ke);
        let tsunami = scaling::tsunami(crater.diameter_km, params.is_land, params.water_depth_m);
        let comparison = scaling::compare_historical(ke);

        debug!(
            energy_j = ke,
            megatons = energy.megatons_tnt,
            crater_km = crater.diameter_km,
            magnitude = earthquake.moment_magnitude,
            tsunami = tsunami.is_some(),
            "impact effects computed"
        );

        ImpactEffectResult {
            parameters: *params,
            energy,
            crater,
            airblast,
            earthquake,
            thermal,
            tsunami,
            damage_zones,
            comparison,
            calculation_method: CALCULATION_METHOD.to_string(),
            calculation_version: CALCULATION_VERSION.to_string(),
        }
    }
}
