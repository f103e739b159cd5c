//! Extraction session - the state record for one pipeline run.
//!
//! A session moves `pending → in_progress → {completed, failed}`. Terminal
//! states never change again; every mutator checks the current status and
//! returns a [`TransitionError`] instead of silently corrupting the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TransitionError, ValidationError};

/// Progress value reported once the run has completed.
pub const PROGRESS_COMPLETE: f64 = 100.0;

/// Geographic coordinate of the impact site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees, [-90, 90]
    pub latitude: f64,

    /// Longitude in decimal degrees, [-180, 180]
    pub longitude: f64,

    /// Altitude in meters
    pub altitude: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Check ranges. NaN fails both range checks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        if let Some(altitude) = self.altitude {
            if !altitude.is_finite() {
                return Err(ValidationError::NonFiniteAltitude(altitude));
            }
        }
        Ok(())
    }
}

/// Parameters of an extraction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Asteroid name or designation (e.g. "Apophis", "101955")
    pub asteroid_name: String,

    /// Impact site
    pub coordinate: Coordinate,
}

impl ExtractionRequest {
    pub fn new(asteroid_name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            asteroid_name: asteroid_name.into(),
            coordinate: Coordinate::new(latitude, longitude),
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.coordinate = self.coordinate.with_altitude(altitude);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.asteroid_name.trim().is_empty() {
            return Err(ValidationError::EmptyAsteroidName);
        }
        self.coordinate.validate()
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five fixed pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AsteroidFetch,
    TopographyFetch,
    GeologyFetch,
    RegionalFetch,
    ImpactCompute,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::AsteroidFetch,
        Stage::TopographyFetch,
        Stage::GeologyFetch,
        Stage::RegionalFetch,
        Stage::ImpactCompute,
    ];

    /// The four fact-gathering stages.
    pub const FETCHES: [Stage; 4] = [
        Stage::AsteroidFetch,
        Stage::TopographyFetch,
        Stage::GeologyFetch,
        Stage::RegionalFetch,
    ];

    /// Progress reached when this stage succeeds.
    pub fn checkpoint(&self) -> f64 {
        match self {
            Stage::AsteroidFetch => 20.0,
            Stage::TopographyFetch => 40.0,
            Stage::GeologyFetch => 60.0,
            Stage::RegionalFetch => 80.0,
            Stage::ImpactCompute => PROGRESS_COMPLETE,
        }
    }

    /// Human label shown as `current_step` while this stage runs.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::AsteroidFetch => "Extracting asteroid data",
            Stage::TopographyFetch => "Extracting topography data",
            Stage::GeologyFetch => "Extracting geological data",
            Stage::RegionalFetch => "Extracting regional data",
            Stage::ImpactCompute => "Calculating impact effects",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AsteroidFetch => "asteroid-fetch",
            Stage::TopographyFetch => "topography-fetch",
            Stage::GeologyFetch => "geology-fetch",
            Stage::RegionalFetch => "regional-fetch",
            Stage::ImpactCompute => "impact-compute",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped error or warning attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub message: String,

    /// Stage that produced the event, if any
    pub stage: Option<Stage>,

    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(message: impl Into<String>, stage: Option<Stage>) -> Self {
        Self {
            message: message.into(),
            stage,
            timestamp: Utc::now(),
        }
    }
}

/// State record tracking one extraction run.
///
/// This is also the externally queryable status shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSession {
    /// Opaque unique id (UUID v4)
    pub id: String,

    pub request: ExtractionRequest,

    pub status: SessionStatus,

    /// 0-100, non-decreasing while in progress
    pub progress: f64,

    /// Human label of the step currently executing
    pub current_step: String,

    pub errors: Vec<SessionEvent>,

    pub warnings: Vec<SessionEvent>,

    /// Source ids that contributed facts, in the order they were persisted
    pub data_sources: Vec<String>,

    /// Set only on the terminal transition
    pub elapsed_seconds: Option<f64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ExtractionSession {
    /// Create a new pending session with a fresh id.
    pub fn new(request: ExtractionRequest) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request,
            status: SessionStatus::Pending,
            progress: 0.0,
            current_step: "Initializing".to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
            data_sources: Vec::new(),
            elapsed_seconds: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending → in_progress`.
    pub fn start(&mut self, first_step: &str) -> Result<(), TransitionError> {
        self.require(SessionStatus::Pending, SessionStatus::InProgress)?;
        if self.progress != 0.0 {
            return Err(TransitionError::ProgressNotIncreasing {
                current: self.progress,
                requested: 0.0,
            });
        }
        self.status = SessionStatus::InProgress;
        self.current_step = first_step.to_string();
        self.touch();
        Ok(())
    }

    /// Record a stage boundary. Progress must strictly increase and stay
    /// below 100, which is reserved for completion.
    pub fn advance(&mut self, progress: f64, next_step: &str) -> Result<(), TransitionError> {
        self.require(SessionStatus::InProgress, SessionStatus::InProgress)?;
        if progress >= PROGRESS_COMPLETE {
            return Err(TransitionError::ProgressOutOfRange(progress));
        }
        if progress <= self.progress {
            return Err(TransitionError::ProgressNotIncreasing {
                current: self.progress,
                requested: progress,
            });
        }
        self.progress = progress;
        self.current_step = next_step.to_string();
        self.touch();
        Ok(())
    }

    /// `in_progress → completed`.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.require(SessionStatus::InProgress, SessionStatus::Completed)?;
        self.status = SessionStatus::Completed;
        self.progress = PROGRESS_COMPLETE;
        self.current_step = "Completed".to_string();
        self.finish();
        Ok(())
    }

    /// `pending | in_progress → failed`. Progress keeps its last value.
    pub fn fail(&mut self, stage: Stage, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::IllegalStatus {
                from: self.status,
                to: SessionStatus::Failed,
            });
        }
        let message = message.into();
        self.status = SessionStatus::Failed;
        self.current_step = format!("Failed during {}", stage);
        self.errors.push(SessionEvent::new(message, Some(stage)));
        self.finish();
        Ok(())
    }

    /// Append a warning. Allowed in any non-terminal state.
    pub fn warn(&mut self, stage: Option<Stage>, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.warnings.push(SessionEvent::new(message, stage));
        self.touch();
    }

    /// Record the source id that produced a fact.
    pub fn record_source(&mut self, source_id: &str) {
        if !self.data_sources.iter().any(|s| s == source_id) {
            self.data_sources.push(source_id.to_string());
        }
    }

    fn require(&self, expected: SessionStatus, to: SessionStatus) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError::IllegalStatus {
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        let elapsed = (now - self.created_at).num_milliseconds() as f64 / 1000.0;
        self.elapsed_seconds = Some(elapsed.max(0.0));
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ExtractionSession {
        ExtractionSession::new(ExtractionRequest::new("Apophis", 10.0, 20.0))
    }

    #[test]
    fn test_coordinate_boundaries_accepted() {
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            assert!(Coordinate::new(lat, lon).validate().is_ok());
        }
    }

    #[test]
    fn test_coordinate_just_outside_rejected() {
        assert_eq!(
            Coordinate::new(90.0001, 0.0).validate(),
            Err(ValidationError::LatitudeOutOfRange(90.0001))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.0001).validate(),
            Err(ValidationError::LongitudeOutOfRange(-180.0001))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_request_rejects_blank_name() {
        let request = ExtractionRequest::new("   ", 0.0, 0.0);
        assert_eq!(request.validate(), Err(ValidationError::EmptyAsteroidName));
    }

    #[test]
    fn test_new_session_is_pending() {
        let s = session();
        assert_eq!(s.status, SessionStatus::Pending);
        assert_eq!(s.progress, 0.0);
        assert!(s.elapsed_seconds.is_none());
        assert_eq!(s.id.len(), 36);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut s = session();
        s.start(Stage::AsteroidFetch.label()).unwrap();
        for stage in Stage::FETCHES {
            s.advance(stage.checkpoint(), "next").unwrap();
        }
        assert_eq!(s.progress, 80.0);
        s.complete().unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.progress, PROGRESS_COMPLETE);
        assert!(s.elapsed_seconds.is_some());
    }

    #[test]
    fn test_progress_must_strictly_increase() {
        let mut s = session();
        s.start("x").unwrap();
        s.advance(20.0, "a").unwrap();
        assert!(matches!(
            s.advance(20.0, "b"),
            Err(TransitionError::ProgressNotIncreasing { .. })
        ));
        assert_eq!(
            s.advance(100.0, "c"),
            Err(TransitionError::ProgressOutOfRange(100.0))
        );
    }

    #[test]
    fn test_cannot_complete_from_pending() {
        let mut s = session();
        assert_eq!(
            s.complete(),
            Err(TransitionError::IllegalStatus {
                from: SessionStatus::Pending,
                to: SessionStatus::Completed,
            })
        );
    }

    #[test]
    fn test_failed_keeps_progress_and_is_terminal() {
        let mut s = session();
        s.start("x").unwrap();
        s.advance(40.0, "geo").unwrap();
        s.fail(Stage::GeologyFetch, "boom").unwrap();

        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.progress, 40.0);
        assert_eq!(s.errors.len(), 1);
        assert_eq!(s.errors[0].stage, Some(Stage::GeologyFetch));

        assert!(s.start("again").is_err());
        assert!(s.complete().is_err());
        assert!(s.fail(Stage::ImpactCompute, "again").is_err());

        s.warn(None, "ignored");
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn test_record_source_deduplicates() {
        let mut s = session();
        s.record_source("nasa_jpl");
        s.record_source("nasa_jpl");
        s.record_source("onegeology");
        assert_eq!(s.data_sources, vec!["nasa_jpl", "onegeology"]);
    }

    #[test]
    fn test_stage_checkpoints_increase() {
        let checkpoints: Vec<f64> = Stage::ALL.iter().map(|s| s.checkpoint()).collect();
        assert_eq!(checkpoints, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
    }
}
