//! Normalized facts produced by the data-source adapters.
//!
//! Each adapter yields exactly one immutable record per session. Persisted
//! facts are flat [`FactRecord`]s keyed by the owning session id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::material::{classify_material, MaterialClass};
use crate::types::session::Stage;

/// Asteroid composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    Stony,
    Metallic,
    Carbonaceous,
    Icy,
    Mixed,
}

impl Composition {
    /// Map an SMASS/Tholen spectral class tag to a composition.
    ///
    /// Only the leading letter is significant ("Sq", "Cb", "Xe").
    pub fn from_spectral_class(tag: &str) -> Option<Self> {
        let lead = tag.trim().chars().next()?.to_ascii_uppercase();
        match lead {
            'S' | 'Q' | 'V' | 'A' | 'R' | 'O' | 'L' | 'K' => Some(Composition::Stony),
            'M' | 'X' | 'E' => Some(Composition::Metallic),
            'C' | 'B' | 'G' | 'F' | 'D' | 'P' | 'T' => Some(Composition::Carbonaceous),
            _ => None,
        }
    }
}

/// Keplerian orbital elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (au)
    pub semi_major_axis_au: Option<f64>,
    pub eccentricity: Option<f64>,
    /// Inclination (deg)
    pub inclination_deg: Option<f64>,
    /// Longitude of ascending node (deg)
    pub ascending_node_deg: Option<f64>,
    /// Argument of perihelion (deg)
    pub perihelion_argument_deg: Option<f64>,
    /// Mean anomaly (deg)
    pub mean_anomaly_deg: Option<f64>,
    /// Orbital period (days)
    pub period_days: Option<f64>,
}

/// One close approach to a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseApproach {
    pub date: String,
    pub distance_au: Option<f64>,
    pub velocity_km_s: Option<f64>,
    pub body: Option<String>,
}

/// Physical data about the impactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidPhysicalData {
    pub name: String,

    /// Catalog designation
    pub catalog_id: String,

    /// Diameter in meters (> 0)
    pub diameter_m: f64,

    /// Velocity in m/s (> 0)
    pub velocity_ms: f64,

    pub mass_kg: Option<f64>,

    pub composition: Option<Composition>,

    pub orbital: Option<OrbitalElements>,

    #[serde(default)]
    pub close_approaches: Vec<CloseApproach>,

    pub is_potentially_hazardous: bool,

    /// Source id (e.g. "nasa_jpl_sbdb")
    pub source: String,
}

impl AsteroidPhysicalData {
    pub fn new(
        name: impl Into<String>,
        catalog_id: impl Into<String>,
        diameter_m: f64,
        velocity_ms: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            catalog_id: catalog_id.into(),
            diameter_m,
            velocity_ms,
            mass_kg: None,
            composition: None,
            orbital: None,
            close_approaches: Vec::new(),
            is_potentially_hazardous: false,
            source: source.into(),
        }
    }

    pub fn with_mass(mut self, mass_kg: f64) -> Self {
        self.mass_kg = Some(mass_kg);
        self
    }

    pub fn with_composition(mut self, composition: Composition) -> Self {
        self.composition = Some(composition);
        self
    }

    pub fn hazardous(mut self) -> Self {
        self.is_potentially_hazardous = true;
        self
    }

    /// Diameter and velocity must be finite and positive.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.diameter_m.is_finite() && self.diameter_m > 0.0) {
            return Err(format!("diameter_m must be positive, got {}", self.diameter_m));
        }
        if !(self.velocity_ms.is_finite() && self.velocity_ms > 0.0) {
            return Err(format!("velocity_ms must be positive, got {}", self.velocity_ms));
        }
        Ok(())
    }
}

/// Ground elevation at the impact coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopographySample {
    pub elevation_m: f64,

    /// Source id (e.g. "COP-DEM_GLO-30-DGED")
    pub source: String,

    pub resolution_m: Option<f64>,

    /// Confidence in [0, 1]
    pub confidence: Option<f64>,
}

impl TopographySample {
    pub fn new(elevation_m: f64, source: impl Into<String>) -> Self {
        Self {
            elevation_m,
            source: source.into(),
            resolution_m: None,
            confidence: None,
        }
    }

    pub fn with_resolution(mut self, resolution_m: f64) -> Self {
        self.resolution_m = Some(resolution_m);
        self
    }

    /// Confidence is clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.elevation_m.is_finite() {
            return Err(format!("elevation_m must be finite, got {}", self.elevation_m));
        }
        Ok(())
    }
}

/// Surface material at the impact coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologicalSample {
    pub description: String,

    pub material: MaterialClass,

    /// Target density in kg/m³ (> 0)
    pub density_kg_m3: f64,

    pub age_period: Option<String>,

    pub formation_name: Option<String>,

    /// Source id (e.g. "USGS", "BGS")
    pub source: String,
}

impl GeologicalSample {
    /// Classify a survey description and take the catalog density.
    pub fn from_description(description: impl Into<String>, source: impl Into<String>) -> Self {
        let description = description.into();
        let material = classify_material(&description);
        Self {
            description,
            material,
            density_kg_m3: material.density_kg_m3(),
            age_period: None,
            formation_name: None,
            source: source.into(),
        }
    }

    pub fn with_age_period(mut self, age_period: impl Into<String>) -> Self {
        self.age_period = Some(age_period.into());
        self
    }

    pub fn with_formation(mut self, formation_name: impl Into<String>) -> Self {
        self.formation_name = Some(formation_name.into());
        self
    }

    pub fn with_density(mut self, density_kg_m3: f64) -> Self {
        self.density_kg_m3 = density_kg_m3;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.density_kg_m3.is_finite() && self.density_kg_m3 > 0.0) {
            return Err(format!(
                "density_kg_m3 must be positive, got {}",
                self.density_kg_m3
            ));
        }
        Ok(())
    }
}

/// Nearest mapped fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultInfo {
    pub name: String,
    pub distance_km: f64,
    pub fault_type: Option<String>,
    /// Slip rate in mm/year
    pub slip_rate_mm_yr: Option<f64>,
    pub activity: Option<String>,
}

impl Default for FaultInfo {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            distance_km: 50.0,
            fault_type: Some("Unknown".to_string()),
            slip_rate_mm_yr: Some(0.0),
            activity: Some("Unknown".to_string()),
        }
    }
}

/// Water depth at the impact coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BathymetrySample {
    /// Water depth in meters (0 on land)
    pub depth_m: f64,
    pub is_land: bool,
}

impl Default for BathymetrySample {
    fn default() -> Self {
        Self::land()
    }
}

impl BathymetrySample {
    pub fn land() -> Self {
        Self {
            depth_m: 0.0,
            is_land: true,
        }
    }

    pub fn ocean(depth_m: f64) -> Self {
        Self {
            depth_m: depth_m.abs(),
            is_land: false,
        }
    }

    /// Interpret a signed elevation raster sample: positive is land,
    /// zero or negative is water of depth `|value|`.
    pub fn from_raster_value(value: f64) -> Self {
        if value > 0.0 {
            Self::land()
        } else {
            Self::ocean(value)
        }
    }

    /// Depth handed to the engine: 0 on land.
    pub fn water_depth_m(&self) -> f64 {
        if self.is_land {
            0.0
        } else {
            self.depth_m
        }
    }
}

/// Population around the impact site.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PopulationInfo {
    pub total: u64,
    pub density_km2: f64,
    pub affected_area_km2: f64,
}

/// Infrastructure counts around the impact site.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfrastructureCounts {
    pub airports: u32,
    pub ports: u32,
    pub power_plants: u32,
    pub hospitals: u32,
    pub schools: u32,
}

impl InfrastructureCounts {
    pub fn total(&self) -> u32 {
        self.airports + self.ports + self.power_plants + self.hospitals + self.schools
    }
}

/// Regional context around the impact site. Any section may be unavailable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionalContext {
    pub nearest_fault: Option<FaultInfo>,
    pub bathymetry: Option<BathymetrySample>,
    pub population: Option<PopulationInfo>,
    pub infrastructure: Option<InfrastructureCounts>,
    pub source: String,
}

impl RegionalContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_fault(mut self, fault: FaultInfo) -> Self {
        self.nearest_fault = Some(fault);
        self
    }

    pub fn with_bathymetry(mut self, bathymetry: BathymetrySample) -> Self {
        self.bathymetry = Some(bathymetry);
        self
    }

    pub fn with_population(mut self, population: PopulationInfo) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_infrastructure(mut self, infrastructure: InfrastructureCounts) -> Self {
        self.infrastructure = Some(infrastructure);
        self
    }

    /// Names of missing sections.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.nearest_fault.is_none() {
            missing.push("fault");
        }
        if self.bathymetry.is_none() {
            missing.push("bathymetry");
        }
        if self.population.is_none() {
            missing.push("population");
        }
        if self.infrastructure.is_none() {
            missing.push("infrastructure");
        }
        missing
    }

    /// Fill missing sections with defaults, returning the names filled.
    pub fn fill_defaults(&mut self) -> Vec<&'static str> {
        let missing = self.missing_sections();
        self.nearest_fault.get_or_insert_with(FaultInfo::default);
        self.bathymetry.get_or_insert_with(BathymetrySample::default);
        self.population.get_or_insert_with(PopulationInfo::default);
        self.infrastructure
            .get_or_insert_with(InfrastructureCounts::default);
        missing
    }
}

/// Any one of the four fact categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Fact {
    Asteroid(AsteroidPhysicalData),
    Topography(TopographySample),
    Geology(GeologicalSample),
    Regional(RegionalContext),
}

impl Fact {
    /// The stage that produces this fact.
    pub fn stage(&self) -> Stage {
        match self {
            Fact::Asteroid(_) => Stage::AsteroidFetch,
            Fact::Topography(_) => Stage::TopographyFetch,
            Fact::Geology(_) => Stage::GeologyFetch,
            Fact::Regional(_) => Stage::RegionalFetch,
        }
    }

    /// Storage key for the category.
    pub fn kind(&self) -> &'static str {
        match self {
            Fact::Asteroid(_) => "asteroid",
            Fact::Topography(_) => "topography",
            Fact::Geology(_) => "geology",
            Fact::Regional(_) => "regional",
        }
    }

    /// Source id of the record.
    pub fn source(&self) -> &str {
        match self {
            Fact::Asteroid(f) => &f.source,
            Fact::Topography(f) => &f.source,
            Fact::Geology(f) => &f.source,
            Fact::Regional(f) => &f.source,
        }
    }
}

/// A persisted fact, referencing its owning session by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub session_id: String,
    pub fact: Fact,
    pub stored_at: DateTime<Utc>,
}

impl FactRecord {
    pub fn new(session_id: impl Into<String>, fact: Fact) -> Self {
        Self {
            session_id: session_id.into(),
            fact,
            stored_at: Utc::now(),
        }
    }
}

/// All facts persisted for one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionFacts {
    pub asteroid: Option<AsteroidPhysicalData>,
    pub topography: Option<TopographySample>,
    pub geology: Option<GeologicalSample>,
    pub regional: Option<RegionalContext>,
}

impl SessionFacts {
    /// Slot a fact into its category.
    pub fn insert(&mut self, fact: Fact) {
        match fact {
            Fact::Asteroid(f) => self.asteroid = Some(f),
            Fact::Topography(f) => self.topography = Some(f),
            Fact::Geology(f) => self.geology = Some(f),
            Fact::Regional(f) => self.regional = Some(f),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.asteroid.is_some()
            && self.topography.is_some()
            && self.geology.is_some()
            && self.regional.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectral_class_mapping() {
        assert_eq!(Composition::from_spectral_class("Sq"), Some(Composition::Stony));
        assert_eq!(Composition::from_spectral_class("Xe"), Some(Composition::Metallic));
        assert_eq!(Composition::from_spectral_class("B"), Some(Composition::Carbonaceous));
        assert_eq!(Composition::from_spectral_class(""), None);
        assert_eq!(Composition::from_spectral_class("Unknown"), None);
    }

    #[test]
    fn test_asteroid_validation() {
        let ok = AsteroidPhysicalData::new("Bennu", "101955", 490.0, 12_000.0, "test");
        assert!(ok.validate().is_ok());

        let zero = AsteroidPhysicalData::new("X", "X", 0.0, 12_000.0, "test");
        assert!(zero.validate().is_err());

        let nan = AsteroidPhysicalData::new("X", "X", 10.0, f64::NAN, "test");
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_geology_from_description() {
        let sample = GeologicalSample::from_description("Jurassic limestone", "BGS");
        assert_eq!(sample.material, MaterialClass::Limestone);
        assert_eq!(sample.density_kg_m3, 2700.0);
    }

    #[test]
    fn test_bathymetry_from_raster() {
        assert_eq!(BathymetrySample::from_raster_value(120.0), BathymetrySample::land());
        let sea = BathymetrySample::from_raster_value(-3800.0);
        assert!(!sea.is_land);
        assert_eq!(sea.depth_m, 3800.0);
        assert_eq!(BathymetrySample::land().water_depth_m(), 0.0);
    }

    #[test]
    fn test_regional_fill_defaults() {
        let mut regional = RegionalContext::new("test").with_bathymetry(BathymetrySample::ocean(100.0));
        let filled = regional.fill_defaults();
        assert_eq!(filled, vec!["fault", "population", "infrastructure"]);
        assert_eq!(regional.nearest_fault.as_ref().unwrap().distance_km, 50.0);
        assert!(!regional.bathymetry.unwrap().is_land);
        assert!(regional.missing_sections().is_empty());
    }

    #[test]
    fn test_session_facts_insert() {
        let mut facts = SessionFacts::default();
        facts.insert(Fact::Topography(TopographySample::new(10.0, "dem")));
        assert!(facts.topography.is_some());
        assert!(!facts.is_complete());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let sample = TopographySample::new(0.0, "dem").with_confidence(1.4);
        assert_eq!(sample.confidence, Some(1.0));
    }
}
