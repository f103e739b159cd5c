//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without making real network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{SourceError, SourceResult, StoreError, StoreResult};
use crate::stores::MemoryStore;
use crate::traits::{
    sources::{AsteroidSource, GeologySource, RegionalSource, TopographySource},
    store::{FactCache, ResultCache, SessionCache},
};
use crate::types::{
    facts::{
        AsteroidPhysicalData, FactRecord, GeologicalSample, RegionalContext, SessionFacts,
        TopographySample,
    },
    result::ImpactRecord,
    session::{Coordinate, ExtractionSession, SessionStatus, Stage},
};

/// Source id reported by [`MockSources`].
pub const MOCK_SOURCE_ID: &str = "mock";

/// A mock implementation of all four data-source traits.
///
/// Returns canned facts, with optional per-stage failures and delays.
/// A category with no canned fact answers `SourceError::NotFound`.
#[derive(Default)]
pub struct MockSources {
    asteroid: Option<AsteroidPhysicalData>,
    topography: Option<TopographySample>,
    geology: Option<GeologicalSample>,
    regional: Option<RegionalContext>,

    /// Injected failure messages by stage
    failures: HashMap<Stage, String>,

    /// Artificial latency by stage
    delays: HashMap<Stage, Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockSourceCall>>>,
}

/// Record of a call made to the mock sources.
#[derive(Debug, Clone, PartialEq)]
pub enum MockSourceCall {
    Asteroid { name: String },
    Topography { coordinate: Coordinate },
    Geology { coordinate: Coordinate },
    Regional { coordinate: Coordinate },
}

impl MockSourceCall {
    pub fn stage(&self) -> Stage {
        match self {
            MockSourceCall::Asteroid { .. } => Stage::AsteroidFetch,
            MockSourceCall::Topography { .. } => Stage::TopographyFetch,
            MockSourceCall::Geology { .. } => Stage::GeologyFetch,
            MockSourceCall::Regional { .. } => Stage::RegionalFetch,
        }
    }
}

impl MockSources {
    /// Create a mock with no canned facts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference scenario on land: 100 m at 17 km/s, 1600 m elevation,
    /// unclassified 2500 kg/m³ target, full regional context.
    pub fn reference_land() -> Self {
        Self::new()
            .with_asteroid(fixtures::reference_asteroid())
            .with_topography(fixtures::highland_elevation())
            .with_geology(fixtures::unclassified_ground())
            .with_regional(fixtures::land_region())
    }

    /// The reference asteroid striking open water of the given depth.
    pub fn reference_ocean(depth_m: f64) -> Self {
        Self::reference_land()
            .with_topography(fixtures::ocean_floor(depth_m))
            .with_regional(fixtures::ocean_region(depth_m))
    }

    pub fn with_asteroid(mut self, asteroid: AsteroidPhysicalData) -> Self {
        self.asteroid = Some(asteroid);
        self
    }

    pub fn with_topography(mut self, topography: TopographySample) -> Self {
        self.topography = Some(topography);
        self
    }

    pub fn with_geology(mut self, geology: GeologicalSample) -> Self {
        self.geology = Some(geology);
        self
    }

    pub fn with_regional(mut self, regional: RegionalContext) -> Self {
        self.regional = Some(regional);
        self
    }

    /// Make the source for `stage` fail with a transport error.
    pub fn with_failure(mut self, stage: Stage, message: impl Into<String>) -> Self {
        self.failures.insert(stage, message.into());
        self
    }

    /// Delay the answer for `stage`.
    pub fn with_delay(mut self, stage: Stage, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockSourceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Stages called, in call order.
    pub fn called_stages(&self) -> Vec<Stage> {
        self.calls().iter().map(MockSourceCall::stage).collect()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    async fn answer<T: Clone>(
        &self,
        call: MockSourceCall,
        canned: &Option<T>,
        query: &str,
    ) -> SourceResult<T> {
        let stage = call.stage();
        self.calls.write().unwrap().push(call);

        if let Some(delay) = self.delays.get(&stage) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(message) = self.failures.get(&stage) {
            return Err(SourceError::Http {
                data_source: MOCK_SOURCE_ID.to_string(),
                message: message.clone(),
            });
        }

        canned.clone().ok_or_else(|| SourceError::NotFound {
            data_source: MOCK_SOURCE_ID.to_string(),
            query: query.to_string(),
        })
    }
}

fn describe(coordinate: &Coordinate) -> String {
    format!("{},{}", coordinate.latitude, coordinate.longitude)
}

#[async_trait]
impl AsteroidSource for MockSources {
    fn source_id(&self) -> &str {
        MOCK_SOURCE_ID
    }

    async fn fetch_asteroid(&self, name: &str) -> SourceResult<AsteroidPhysicalData> {
        let call = MockSourceCall::Asteroid {
            name: name.to_string(),
        };
        self.answer(call, &self.asteroid, name).await
    }
}

#[async_trait]
impl TopographySource for MockSources {
    fn source_id(&self) -> &str {
        MOCK_SOURCE_ID
    }

    async fn fetch_topography(&self, coordinate: &Coordinate) -> SourceResult<TopographySample> {
        let call = MockSourceCall::Topography {
            coordinate: *coordinate,
        };
        self.answer(call, &self.topography, &describe(coordinate))
            .await
    }
}

#[async_trait]
impl GeologySource for MockSources {
    fn source_id(&self) -> &str {
        MOCK_SOURCE_ID
    }

    async fn fetch_geology(&self, coordinate: &Coordinate) -> SourceResult<GeologicalSample> {
        let call = MockSourceCall::Geology {
            coordinate: *coordinate,
        };
        self.answer(call, &self.geology, &describe(coordinate)).await
    }
}

#[async_trait]
impl RegionalSource for MockSources {
    fn source_id(&self) -> &str {
        MOCK_SOURCE_ID
    }

    async fn fetch_regional(&self, coordinate: &Coordinate) -> SourceResult<RegionalContext> {
        let call = MockSourceCall::Regional {
            coordinate: *coordinate,
        };
        self.answer(call, &self.regional, &describe(coordinate))
            .await
    }
}

/// A [`MemoryStore`] that keeps every session snapshot it persists.
///
/// Lets tests observe the progress and status path of a run. It can also be
/// told to reject some writes to exercise storage failures.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    snapshots: Arc<RwLock<Vec<ExtractionSession>>>,
    rejected_fact_kind: Option<&'static str>,
    rejects_results: bool,
    rejected_update_status: Option<SessionStatus>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to store facts of `kind` ("asteroid", "topography", ...).
    pub fn rejecting_facts(mut self, kind: &'static str) -> Self {
        self.rejected_fact_kind = Some(kind);
        self
    }

    /// Refuse to store impact results.
    pub fn rejecting_results(mut self) -> Self {
        self.rejects_results = true;
        self
    }

    /// Refuse session updates that would persist `status`.
    pub fn rejecting_updates_to(mut self, status: SessionStatus) -> Self {
        self.rejected_update_status = Some(status);
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Every persisted session state, in write order.
    pub fn snapshots(&self) -> Vec<ExtractionSession> {
        self.snapshots.read().unwrap().clone()
    }

    /// Persisted progress values with consecutive repeats collapsed.
    pub fn progress_path(&self) -> Vec<f64> {
        let mut path: Vec<f64> = self.snapshots().iter().map(|s| s.progress).collect();
        path.dedup();
        path
    }

    /// Persisted statuses with consecutive repeats collapsed.
    pub fn status_path(&self) -> Vec<SessionStatus> {
        let mut path: Vec<SessionStatus> = self.snapshots().iter().map(|s| s.status).collect();
        path.dedup();
        path
    }

    fn record(&self, session: &ExtractionSession) {
        self.snapshots.write().unwrap().push(session.clone());
    }
}

#[async_trait]
impl SessionCache for RecordingStore {
    async fn insert_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        self.inner.insert_session(session).await?;
        self.record(session);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<ExtractionSession>> {
        self.inner.get_session(session_id).await
    }

    async fn update_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        if self.rejected_update_status == Some(session.status) {
            return Err(StoreError::Backend(
                format!("{} session updates rejected", session.status).into(),
            ));
        }
        self.inner.update_session(session).await?;
        self.record(session);
        Ok(())
    }
}

#[async_trait]
impl FactCache for RecordingStore {
    async fn store_fact(&self, record: &FactRecord) -> StoreResult<()> {
        if self.rejected_fact_kind == Some(record.fact.kind()) {
            return Err(StoreError::Backend(
                format!("{} facts rejected", record.fact.kind()).into(),
            ));
        }
        self.inner.store_fact(record).await
    }

    async fn get_facts(&self, session_id: &str) -> StoreResult<SessionFacts> {
        self.inner.get_facts(session_id).await
    }
}

#[async_trait]
impl ResultCache for RecordingStore {
    async fn store_result(&self, record: &ImpactRecord) -> StoreResult<()> {
        if self.rejects_results {
            return Err(StoreError::Backend("impact results rejected".into()));
        }
        self.inner.store_result(record).await
    }

    async fn get_result(&self, session_id: &str) -> StoreResult<Option<ImpactRecord>> {
        self.inner.get_result(session_id).await
    }
}

/// Canned facts for the reference scenarios.
pub mod fixtures {
    use crate::types::facts::{
        AsteroidPhysicalData, BathymetrySample, Composition, FaultInfo, GeologicalSample,
        InfrastructureCounts, PopulationInfo, RegionalContext, TopographySample,
    };
    use crate::types::session::ExtractionRequest;

    /// Request for the reference asteroid over central Japan.
    pub fn reference_request() -> ExtractionRequest {
        ExtractionRequest::new("Apophis", 35.6762, 139.6503)
    }

    /// 100 m stony impactor at 17 km/s.
    pub fn reference_asteroid() -> AsteroidPhysicalData {
        AsteroidPhysicalData::new("Apophis", "99942", 100.0, 17_000.0, "mock_sbdb")
            .with_composition(Composition::Stony)
    }

    pub fn highland_elevation() -> TopographySample {
        TopographySample::new(1600.0, "mock_dem")
            .with_resolution(30.0)
            .with_confidence(0.95)
    }

    /// Sea floor at `depth_m` below sea level.
    pub fn ocean_floor(depth_m: f64) -> TopographySample {
        TopographySample::new(-depth_m, "mock_dem").with_resolution(450.0)
    }

    /// Granite, 2750 kg/m³.
    pub fn granite() -> GeologicalSample {
        GeologicalSample::from_description("Biotite granite", "mock_geology")
            .with_age_period("Cretaceous")
    }

    /// A unit the catalog does not recognize, 2500 kg/m³.
    pub fn unclassified_ground() -> GeologicalSample {
        GeologicalSample::from_description("Unknown geological unit", "mock_geology")
    }

    pub fn land_region() -> RegionalContext {
        RegionalContext::new("mock_regional")
            .with_fault(FaultInfo {
                name: "Median Tectonic Line".to_string(),
                distance_km: 120.0,
                fault_type: Some("strike-slip".to_string()),
                slip_rate_mm_yr: Some(5.0),
                activity: Some("active".to_string()),
            })
            .with_bathymetry(BathymetrySample::land())
            .with_population(PopulationInfo {
                total: 1_200_000,
                density_km2: 6_000.0,
                affected_area_km2: 200.0,
            })
            .with_infrastructure(InfrastructureCounts {
                airports: 2,
                ports: 1,
                power_plants: 3,
                hospitals: 40,
                schools: 300,
            })
    }

    /// Open water of `depth_m`, no fault or population data.
    pub fn ocean_region(depth_m: f64) -> RegionalContext {
        RegionalContext::new("mock_regional")
            .with_bathymetry(BathymetrySample::ocean(depth_m))
            .with_infrastructure(InfrastructureCounts::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sources_track_calls() {
        let mock = MockSources::reference_land();
        let coordinate = Coordinate::new(1.0, 2.0);

        mock.fetch_asteroid("Apophis").await.unwrap();
        mock.fetch_geology(&coordinate).await.unwrap();

        assert_eq!(
            mock.called_stages(),
            vec![Stage::AsteroidFetch, Stage::GeologyFetch]
        );
        mock.clear_calls();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mock_sources_failures_and_gaps() {
        let mock = MockSources::new()
            .with_asteroid(fixtures::reference_asteroid())
            .with_failure(Stage::AsteroidFetch, "catalog down");

        let err = mock.fetch_asteroid("Apophis").await.unwrap_err();
        assert!(matches!(err, SourceError::Http { ref message, .. } if message == "catalog down"));

        let err = mock
            .fetch_topography(&Coordinate::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_recording_store_paths() {
        let store = RecordingStore::new();
        let mut session = ExtractionSession::new(fixtures::reference_request());
        store.insert_session(&session).await.unwrap();

        session.start("fetching").unwrap();
        store.update_session(&session).await.unwrap();
        session.advance(20.0, "next").unwrap();
        store.update_session(&session).await.unwrap();

        assert_eq!(store.progress_path(), vec![0.0, 20.0]);
        assert_eq!(
            store.status_path(),
            vec![SessionStatus::Pending, SessionStatus::InProgress]
        );
        assert_eq!(store.snapshots().len(), 3);
    }

    #[test]
    fn test_fixture_densities() {
        assert_eq!(fixtures::granite().density_kg_m3, 2750.0);
        assert_eq!(fixtures::unclassified_ground().density_kg_m3, 2500.0);
        assert_eq!(fixtures::ocean_floor(4000.0).elevation_m, -4000.0);
    }
}
