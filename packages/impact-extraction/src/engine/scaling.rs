//! Closed-form scaling laws: energy, crater, seismic, thermal, tsunami.

use std::f64::consts::PI;

use super::constants::{
    HISTORICAL_EVENTS, JOULES_PER_KILOTON, JOULES_PER_MEGATON, MELT_ENERGY_J_KG,
    MIN_WAVE_HEIGHT_M, REFERENCE_DISTANCES_KM,
};
use crate::types::result::{
    CraterResult, EarthquakeResult, EnergyResult, HistoricalComparison, ImpactParameters,
    ShakingIntensity, ThermalResult, TsunamiResult, WaveHeight,
};

/// Kinetic energy of a spherical impactor.
pub fn kinetic_energy(diameter_m: f64, velocity_ms: f64, density_kg_m3: f64) -> f64 {
    let radius = diameter_m / 2.0;
    let volume = (4.0 / 3.0) * PI * radius.powi(3);
    0.5 * density_kg_m3 * volume * velocity_ms * velocity_ms
}

pub fn energy(params: &ImpactParameters) -> EnergyResult {
    let radius = params.diameter_m / 2.0;
    let volume = (4.0 / 3.0) * PI * radius.powi(3);
    let mass = params.asteroid_density_kg_m3 * volume;
    let joules = 0.5 * mass * params.velocity_ms * params.velocity_ms;

    EnergyResult {
        joules,
        megatons_tnt: joules / JOULES_PER_MEGATON,
        kilotons_tnt: joules / JOULES_PER_KILOTON,
        impactor_mass_kg: mass,
        impactor_volume_m3: volume,
    }
}

/// Transient crater from the density-ratio scaling law.
pub fn crater(params: &ImpactParameters, energy_j: f64) -> CraterResult {
    let density_ratio = params.asteroid_density_kg_m3 / params.target_density_kg_m3;
    let energy_term = energy_j / (MELT_ENERGY_J_KG * params.target_density_kg_m3);
    let diameter_m = 1.161 * density_ratio.cbrt() * energy_term.powf(0.22) * params.diameter_m;
    let depth_m = 0.25 * diameter_m;

    CraterResult {
        diameter_m,
        diameter_km: diameter_m / 1000.0,
        depth_m,
        depth_km: depth_m / 1000.0,
    }
}

pub fn moment_magnitude(energy_j: f64) -> f64 {
    0.67 * energy_j.log10() - 5.87
}

/// Shaking intensity at a distance, clamped to [1, 12].
pub fn shaking_intensity(magnitude: f64, distance_km: f64) -> f64 {
    (magnitude - distance_km.log10() - 1.0).clamp(1.0, 12.0)
}

pub fn earthquake(energy_j: f64) -> EarthquakeResult {
    let moment_magnitude = moment_magnitude(energy_j);
    EarthquakeResult {
        moment_magnitude,
        richter_equivalent: moment_magnitude - 0.2,
        intensities: REFERENCE_DISTANCES_KM
            .iter()
            .map(|&distance_km| ShakingIntensity {
                distance_km,
                intensity: shaking_intensity(moment_magnitude, distance_km),
            })
            .collect(),
    }
}

pub fn thermal(energy_j: f64) -> ThermalResult {
    let temperature_k = 3000.0 + energy_j.powf(0.25) / 1000.0;
    ThermalResult {
        radius_km: energy_j.cbrt() / 2000.0,
        fireball_temperature_k: temperature_k,
        fireball_temperature_c: temperature_k - 273.15,
    }
}

/// Wave height at `distance_km` from the impact point, floored.
pub fn wave_height_at(crater_diameter_km: f64, water_depth_m: f64, distance_km: f64) -> f64 {
    let depth_km = water_depth_m / 1000.0;
    let height = 0.15
        * (crater_diameter_km.powi(4) / (depth_km * depth_km * distance_km * distance_km))
            .powf(0.25);
    height.max(MIN_WAVE_HEIGHT_M)
}

/// Tsunami estimate; `None` on land or without water.
pub fn tsunami(crater_diameter_km: f64, is_land: bool, water_depth_m: f64) -> Option<TsunamiResult> {
    if is_land || water_depth_m.is_nan() || water_depth_m <= 0.0 {
        return None;
    }

    let depth_km = water_depth_m / 1000.0;
    let initial = 0.15 * (crater_diameter_km.powi(4) / (depth_km * depth_km)).powf(0.25);

    Some(TsunamiResult {
        initial_wave_height_m: initial.max(MIN_WAVE_HEIGHT_M),
        water_depth_m,
        wave_heights: REFERENCE_DISTANCES_KM
            .iter()
            .map(|&distance_km| WaveHeight {
                distance_km,
                height_m: wave_height_at(crater_diameter_km, water_depth_m, distance_km),
            })
            .collect(),
    })
}

/// Closest historical event by order of magnitude.
pub fn compare_historical(energy_j: f64) -> HistoricalComparison {
    let distance = |reference: f64| (energy_j / reference).log10().abs();

    let (mut best_name, mut best_energy) = HISTORICAL_EVENTS[0];
    for &(name, reference) in &HISTORICAL_EVENTS[1..] {
        if distance(reference) < distance(best_energy) {
            best_name = name;
            best_energy = reference;
        }
    }

    HistoricalComparison {
        event: best_name.to_string(),
        event_energy_joules: best_energy,
        ratio: energy_j / best_energy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference() -> ImpactParameters {
        ImpactParameters::new(100.0, 17_000.0)
            .with_asteroid_density(3000.0)
            .with_target_density(2500.0)
    }

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn test_reference_energy() {
        let e = energy(&reference());
        assert!(close(e.impactor_volume_m3, 523_598.7756, 1e-3));
        assert!(close(e.impactor_mass_kg, 1.570_796_3e9, 1e2));
        assert!(close(e.joules / 2.2698006922186253e17, 1.0, 1e-12));
        assert!(close(e.megatons_tnt, 54.2495, 1e-3));
        assert!(close(e.kilotons_tnt, 54_249.5, 1.0));
    }

    #[test]
    fn test_reference_crater() {
        let params = reference();
        let e = energy(&params);
        let c = crater(&params, e.joules);
        assert!(close(c.diameter_m, 5681.325, 1e-2));
        assert!(close(c.depth_km, 1.420331, 1e-5));
        assert_eq!(c.depth_m, 0.25 * c.diameter_m);
    }

    #[test]
    fn test_reference_earthquake() {
        let quake = earthquake(2.2698006922186253e17);
        assert!(close(quake.moment_magnitude, 5.75851, 1e-4));
        assert!(close(quake.richter_equivalent, 5.55851, 1e-4));
        let expected = [3.7585, 3.0595, 2.7585, 2.0595, 1.7585];
        for (sample, want) in quake.intensities.iter().zip(expected) {
            assert!(close(sample.intensity, want, 1e-3));
        }
    }

    #[test]
    fn test_intensity_clamped() {
        assert_eq!(shaking_intensity(2.0, 1000.0), 1.0);
        assert_eq!(shaking_intensity(20.0, 10.0), 12.0);
    }

    #[test]
    fn test_reference_thermal() {
        let t = thermal(2.2698006922186253e17);
        assert!(close(t.radius_km, 304.9996, 1e-3));
        assert!(close(t.fireball_temperature_k, 3021.827, 1e-3));
        assert!(close(t.fireball_temperature_c, 2748.677, 1e-3));
    }

    #[test]
    fn test_tsunami_absent_on_land() {
        assert!(tsunami(5.68, true, 0.0).is_none());
        assert!(tsunami(5.68, true, 4000.0).is_none());
        assert!(tsunami(5.68, false, 0.0).is_none());
    }

    #[test]
    fn test_tsunami_deep_ocean() {
        let wave = tsunami(5.681325394070649, false, 4000.0).unwrap();
        assert!(close(wave.initial_wave_height_m, 0.42610, 1e-4));
        assert!(close(wave.wave_heights[0].height_m, 0.13474, 1e-4));
        // Farther out the estimate falls below the floor
        assert!(wave.wave_heights[1..].iter().all(|w| w.height_m == 0.1));
    }

    #[test]
    fn test_historical_comparison() {
        assert_eq!(compare_historical(2.2698006922186253e17).event, "Tsar Bomba");
        assert_eq!(compare_historical(5e13).event, "Hiroshima");
        assert_eq!(compare_historical(1e24).event, "Chicxulub");
    }

    proptest! {
        #[test]
        fn prop_halving_diameter_divides_energy_by_eight(
            diameter in 1.0f64..5000.0,
            velocity in 1000.0f64..70_000.0,
        ) {
            let full = kinetic_energy(diameter, velocity, 3000.0);
            let half = kinetic_energy(diameter / 2.0, velocity, 3000.0);
            prop_assert!(((full / half) - 8.0).abs() < 1e-9);
        }

        #[test]
        fn prop_doubling_velocity_quadruples_energy(
            diameter in 1.0f64..5000.0,
            velocity in 1000.0f64..70_000.0,
        ) {
            let slow = kinetic_energy(diameter, velocity, 3000.0);
            let fast = kinetic_energy(diameter, velocity * 2.0, 3000.0);
            prop_assert!(((fast / slow) - 4.0).abs() < 1e-9);
        }

        #[test]
        fn prop_crater_grows_with_energy(
            diameter in 1.0f64..5000.0,
            growth in 1.01f64..10.0,
        ) {
            let small = ImpactParameters::for_diameter(diameter);
            let large = ImpactParameters::for_diameter(diameter * growth);
            let small_crater = crater(&small, energy(&small).joules);
            let large_crater = crater(&large, energy(&large).joules);
            prop_assert!(large_crater.diameter_m > small_crater.diameter_m);
        }

        #[test]
        fn prop_ocean_tsunami_at_least_floor(
            crater_km in 0.001f64..200.0,
            depth in 1.0f64..11_000.0,
        ) {
            let wave = tsunami(crater_km, false, depth);
            prop_assert!(wave.is_some());
            let wave = wave.unwrap();
            prop_assert!(wave.initial_wave_height_m >= 0.1);
            prop_assert!(wave.wave_heights.iter().all(|w| w.height_m >= 0.1));
        }
    }
}
