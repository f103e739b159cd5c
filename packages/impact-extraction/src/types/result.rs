//! Impact-effect results and the externally queryable result shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::facts::{AsteroidPhysicalData, GeologicalSample, RegionalContext, TopographySample};
use crate::types::session::{ExtractionSession, SessionStatus};

/// Provenance attached to every result.
pub const CALCULATION_METHOD: &str = "simplified_scaling_laws";
pub const CALCULATION_VERSION: &str = "1.0";

/// Reference impact velocity used when only a diameter is known (m/s).
pub const DEFAULT_VELOCITY_MS: f64 = 17_000.0;

/// Reference impactor density (kg/m³).
pub const DEFAULT_ASTEROID_DENSITY: f64 = 3000.0;

/// Reference target density (kg/m³).
pub const DEFAULT_TARGET_DENSITY: f64 = 2500.0;

/// Engine inputs, assembled from the four facts plus the configured
/// impactor density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactParameters {
    pub diameter_m: f64,
    pub velocity_ms: f64,
    pub asteroid_density_kg_m3: f64,
    pub target_density_kg_m3: f64,
    pub elevation_m: f64,
    pub is_land: bool,
    /// 0 on land
    pub water_depth_m: f64,
}

impl ImpactParameters {
    /// Land impact on the reference target at sea level.
    pub fn new(diameter_m: f64, velocity_ms: f64) -> Self {
        Self {
            diameter_m,
            velocity_ms,
            asteroid_density_kg_m3: DEFAULT_ASTEROID_DENSITY,
            target_density_kg_m3: DEFAULT_TARGET_DENSITY,
            elevation_m: 0.0,
            is_land: true,
            water_depth_m: 0.0,
        }
    }

    /// Reference velocity, for when only a size estimate is available.
    pub fn for_diameter(diameter_m: f64) -> Self {
        Self::new(diameter_m, DEFAULT_VELOCITY_MS)
    }

    pub fn with_asteroid_density(mut self, density_kg_m3: f64) -> Self {
        self.asteroid_density_kg_m3 = density_kg_m3;
        self
    }

    pub fn with_target_density(mut self, density_kg_m3: f64) -> Self {
        self.target_density_kg_m3 = density_kg_m3;
        self
    }

    pub fn with_elevation(mut self, elevation_m: f64) -> Self {
        self.elevation_m = elevation_m;
        self
    }

    /// Ocean impact into water of the given depth.
    pub fn over_water(mut self, water_depth_m: f64) -> Self {
        self.is_land = false;
        self.water_depth_m = water_depth_m;
        self
    }

    /// Assemble parameters from the four session facts.
    pub fn from_facts(
        asteroid: &AsteroidPhysicalData,
        topography: &TopographySample,
        geology: &GeologicalSample,
        regional: &RegionalContext,
        asteroid_density_kg_m3: f64,
    ) -> Self {
        let bathymetry = regional.bathymetry.unwrap_or_default();
        Self {
            diameter_m: asteroid.diameter_m,
            velocity_ms: asteroid.velocity_ms,
            asteroid_density_kg_m3,
            target_density_kg_m3: geology.density_kg_m3,
            elevation_m: topography.elevation_m,
            is_land: bathymetry.is_land,
            water_depth_m: bathymetry.water_depth_m(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyResult {
    pub joules: f64,
    pub megatons_tnt: f64,
    pub kilotons_tnt: f64,
    pub impactor_mass_kg: f64,
    pub impactor_volume_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraterResult {
    pub diameter_m: f64,
    pub diameter_km: f64,
    pub depth_m: f64,
    pub depth_km: f64,
}

/// Whether a blast radius came out of the Newton solve or the closed-form
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusSource {
    Solved,
    Fallback,
}

/// Radius at which overpressure drops to a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadius {
    pub threshold_psi: f64,
    pub radius_km: f64,
    pub source: RadiusSource,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirblastResult {
    /// Ordered by increasing threshold
    pub radii: Vec<BlastRadius>,
    pub fireball_radius_km: f64,
}

impl AirblastResult {
    pub fn radius_for(&self, threshold_psi: f64) -> Option<f64> {
        self.radii
            .iter()
            .find(|r| r.threshold_psi == threshold_psi)
            .map(|r| r.radius_km)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShakingIntensity {
    pub distance_km: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeResult {
    pub moment_magnitude: f64,
    pub richter_equivalent: f64,
    pub intensities: Vec<ShakingIntensity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalResult {
    pub radius_km: f64,
    pub fireball_temperature_k: f64,
    pub fireball_temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveHeight {
    pub distance_km: f64,
    pub height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsunamiResult {
    pub initial_wave_height_m: f64,
    pub water_depth_m: f64,
    pub wave_heights: Vec<WaveHeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Light,
    Moderate,
    Severe,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageZone {
    pub name: String,
    pub description: String,
    pub threshold_psi: f64,
    pub radius_km: f64,
    pub severity: Severity,
}

/// Closest historical event by order of magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalComparison {
    pub event: String,
    pub event_energy_joules: f64,
    /// Impact energy divided by the event energy
    pub ratio: f64,
}

/// Everything the engine computes for one impact.
///
/// Carries no timestamps so identical inputs give identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEffectResult {
    pub parameters: ImpactParameters,
    pub energy: EnergyResult,
    pub crater: CraterResult,
    pub airblast: AirblastResult,
    pub earthquake: EarthquakeResult,
    pub thermal: ThermalResult,
    pub tsunami: Option<TsunamiResult>,
    pub damage_zones: Vec<DamageZone>,
    pub comparison: HistoricalComparison,
    pub calculation_method: String,
    pub calculation_version: String,
}

/// A persisted result, referencing its owning session by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub session_id: String,
    pub result: ImpactEffectResult,
    pub calculated_at: DateTime<Utc>,
}

impl ImpactRecord {
    pub fn new(session_id: impl Into<String>, result: ImpactEffectResult) -> Self {
        Self {
            session_id: session_id.into(),
            result,
            calculated_at: Utc::now(),
        }
    }
}

/// Session metadata included with a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub elapsed_seconds: Option<f64>,
    pub data_sources: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<&ExtractionSession> for SessionSummary {
    fn from(session: &ExtractionSession) -> Self {
        Self {
            session_id: session.id.clone(),
            status: session.status,
            elapsed_seconds: session.elapsed_seconds,
            data_sources: session.data_sources.clone(),
            warnings: session.warnings.iter().map(|w| w.message.clone()).collect(),
        }
    }
}

/// Full result of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub session: SessionSummary,
    pub asteroid: AsteroidPhysicalData,
    pub topography: TopographySample,
    pub geological: GeologicalSample,
    pub regional: RegionalContext,
    pub impact_calculation: ImpactEffectResult,
}
