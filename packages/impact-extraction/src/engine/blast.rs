//! Airblast overpressure radii and the damage zones derived from them.
//!
//! Overpressure at distance `r` (m) from a release of `KE` joules:
//!
//! ```text
//! P(r) = 0.85·KE^(1/3)/r + 3·KE^(2/3)/r² + 7·KE/r³
//! ```
//!
//! `P` is strictly decreasing in `r`, so each threshold has exactly one
//! radius. It is found with a damped Newton iteration; anything that goes
//! wrong numerically falls back to the closed-form `KE^(1/3)/1000` km.

use tracing::debug;

use super::constants::{OVERPRESSURE_THRESHOLDS_PSI, PSI_TO_PA};
use crate::types::result::{AirblastResult, BlastRadius, DamageZone, RadiusSource, Severity};

/// Newton starting radius (m).
const INITIAL_RADIUS_M: f64 = 1000.0;

/// Converged once a step moves the radius less than this (m).
const STEP_TOLERANCE_M: f64 = 1.0;

const MAX_ITERATIONS: u32 = 100;

/// Below this |P'| the Newton step is meaningless.
const MIN_DERIVATIVE: f64 = 1e-12;

/// Overpressure model coefficients for one energy.
#[derive(Debug, Clone, Copy)]
struct Overpressure {
    a: f64,
    b: f64,
    c: f64,
}

impl Overpressure {
    fn new(energy_j: f64) -> Self {
        Self {
            a: 0.85 * energy_j.cbrt(),
            b: 3.0 * energy_j.powf(2.0 / 3.0),
            c: 7.0 * energy_j,
        }
    }

    /// Overpressure in Pa at `r` meters.
    fn at(&self, r: f64) -> f64 {
        self.a / r + self.b / (r * r) + self.c / (r * r * r)
    }

    /// dP/dr at `r` meters.
    fn slope(&self, r: f64) -> f64 {
        -self.a / (r * r) - 2.0 * self.b / (r * r * r) - 3.0 * self.c / (r * r * r * r)
    }
}

/// Closed-form estimate used whenever the solve is abandoned (km).
pub fn fallback_radius_km(energy_j: f64) -> f64 {
    energy_j.cbrt() / 1000.0
}

/// Overpressure in Pa at `distance_m`.
pub fn overpressure_pa(energy_j: f64, distance_m: f64) -> f64 {
    Overpressure::new(energy_j).at(distance_m)
}

/// Solve for the radius at which overpressure falls to `threshold_psi`.
pub fn solve_radius(energy_j: f64, threshold_psi: f64) -> BlastRadius {
    let model = Overpressure::new(energy_j);
    let target = threshold_psi * PSI_TO_PA;
    let mut r = INITIAL_RADIUS_M;

    for iteration in 1..=MAX_ITERATIONS {
        let slope = model.slope(r);
        if !slope.is_finite() || slope.abs() < MIN_DERIVATIVE {
            debug!(threshold_psi, iteration, r, "degenerate overpressure slope");
            return fallback(energy_j, threshold_psi, iteration);
        }

        let next = r - (model.at(r) - target) / slope;
        if !next.is_finite() || next <= 0.0 {
            // Overshot past the origin: damp and retry from closer in.
            r /= 2.0;
            continue;
        }

        if (next - r).abs() < STEP_TOLERANCE_M {
            return BlastRadius {
                threshold_psi,
                radius_km: next / 1000.0,
                source: RadiusSource::Solved,
                iterations: iteration,
            };
        }
        r = next;
    }

    debug!(threshold_psi, r, "overpressure solve did not converge");
    fallback(energy_j, threshold_psi, MAX_ITERATIONS)
}

fn fallback(energy_j: f64, threshold_psi: f64, iterations: u32) -> BlastRadius {
    BlastRadius {
        threshold_psi,
        radius_km: fallback_radius_km(energy_j),
        source: RadiusSource::Fallback,
        iterations,
    }
}

/// Radii for every standard threshold plus the fireball radius.
pub fn airblast(energy_j: f64) -> AirblastResult {
    AirblastResult {
        radii: OVERPRESSURE_THRESHOLDS_PSI
            .iter()
            .map(|&psi| solve_radius(energy_j, psi))
            .collect(),
        fireball_radius_km: energy_j.cbrt() / 1000.0,
    }
}

/// Damage zone label for each standard threshold.
fn zone_for(threshold_psi: f64) -> Option<(&'static str, &'static str, Severity)> {
    // Thresholds are compared exactly; they come from the same constant table.
    if threshold_psi == 1.0 {
        Some(("window_shatter", "Most windows shatter", Severity::Light))
    } else if threshold_psi == 2.5 {
        Some((
            "residential_damage",
            "Most residential buildings severely damaged",
            Severity::Moderate,
        ))
    } else if threshold_psi == 5.0 {
        Some(("building_destruction", "Most buildings destroyed", Severity::Severe))
    } else if threshold_psi == 15.0 {
        Some((
            "concrete_damage",
            "Reinforced concrete buildings severely damaged",
            Severity::Extreme,
        ))
    } else {
        None
    }
}

pub fn damage_zones(airblast: &AirblastResult) -> Vec<DamageZone> {
    airblast
        .radii
        .iter()
        .filter_map(|radius| {
            zone_for(radius.threshold_psi).map(|(name, description, severity)| DamageZone {
                name: name.to_string(),
                description: description.to_string(),
                threshold_psi: radius.threshold_psi,
                radius_km: radius.radius_km,
                severity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REFERENCE_KE: f64 = 2.2698006922186253e17;

    #[test]
    fn test_reference_radii() {
        let blast = airblast(REFERENCE_KE);
        let expected = [62.2144, 45.6606, 36.1597, 25.0059];
        for (radius, want) in blast.radii.iter().zip(expected) {
            assert_eq!(radius.source, RadiusSource::Solved);
            assert!(radius.iterations < 25);
            assert!(
                (radius.radius_km - want).abs() < 1e-3,
                "{} psi: {} vs {}",
                radius.threshold_psi,
                radius.radius_km,
                want
            );
        }
        assert!((blast.fireball_radius_km - 609.999).abs() < 1e-2);
    }

    #[test]
    fn test_solved_radius_hits_target_pressure() {
        let radius = solve_radius(REFERENCE_KE, 5.0);
        let pressure = overpressure_pa(REFERENCE_KE, radius.radius_km * 1000.0);
        let target = 5.0 * PSI_TO_PA;
        assert!((pressure - target).abs() / target < 1e-3);
    }

    #[test]
    fn test_degenerate_energy_falls_back() {
        let radius = solve_radius(0.0, 1.0);
        assert_eq!(radius.source, RadiusSource::Fallback);
        assert_eq!(radius.radius_km, 0.0);
    }

    #[test]
    fn test_damage_zones_follow_radii() {
        let blast = airblast(REFERENCE_KE);
        let zones = damage_zones(&blast);
        let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "window_shatter",
                "residential_damage",
                "building_destruction",
                "concrete_damage"
            ]
        );
        assert_eq!(zones[3].severity, Severity::Extreme);
        assert_eq!(zones[0].radius_km, blast.radii[0].radius_km);
    }

    proptest! {
        #[test]
        fn prop_radii_strictly_decrease_with_threshold(exponent in 12.0f64..24.0) {
            let energy = 10f64.powf(exponent);
            let blast = airblast(energy);
            for pair in blast.radii.windows(2) {
                prop_assert!(pair[0].radius_km > pair[1].radius_km);
            }
        }
    }
}
