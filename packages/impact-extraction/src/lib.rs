//! Asteroid Impact Extraction Library
//!
//! Gathers the facts needed to model an asteroid impact at a chosen site
//! (impactor physics, elevation, surface geology, regional context), persists
//! them as they arrive, and runs a deterministic impact-effect engine over
//! them.
//!
//! # Design Philosophy
//!
//! - Adapters fetch, the engine computes: the engine is a pure function
//! - Every fact is persisted the moment its stage completes
//! - One observable session per run, progress moves in fixed checkpoints
//! - First stage failure ends the run; nothing is retried unless configured
//!
//! # Usage
//!
//! ```rust,ignore
//! use impact_extraction::{ExtractionOrchestrator, ExtractionRequest, MemoryStore, SourceSet};
//!
//! let sources = SourceSet::new(sbdb, dem, geology, regional);
//! let orchestrator = ExtractionOrchestrator::new(MemoryStore::new(), sources);
//!
//! let request = ExtractionRequest::new("Apophis", 35.6762, 139.6503);
//! let session_id = orchestrator.start(request).await?;
//! let result = orchestrator.execute(&session_id, CancellationToken::new()).await?;
//!
//! let report = orchestrator.get_result(&session_id).await?;
//! println!("{:.1} Mt, crater {:.2} km", result.energy.megatons_tnt, result.crater.diameter_km);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (data sources, SessionStore)
//! - [`types`] - Sessions, facts, results and configuration
//! - [`pipeline`] - Stage execution and the orchestrator
//! - [`engine`] - Impact-effect scaling laws and blast solver
//! - [`sources`] - Data-source implementations (JPL SBDB, GuardedSource)
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`testing`] - Mock implementations for testing

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    ConfigError, PipelineError, SourceError, StageFailure, StoreError, TransitionError,
    ValidationError,
};
pub use traits::{
    sources::{AsteroidSource, GeologySource, RegionalSource, SourceSet, TopographySource},
    store::{FactCache, ResultCache, SessionCache, SessionStore},
};
pub use types::{
    config::{FetchMode, PipelineConfig, SourceConfig},
    facts::{
        AsteroidPhysicalData, BathymetrySample, CloseApproach, Composition, Fact, FactRecord,
        FaultInfo, GeologicalSample, InfrastructureCounts, OrbitalElements, PopulationInfo,
        RegionalContext, SessionFacts, TopographySample,
    },
    material::{classify_material, MaterialClass},
    result::{
        AirblastResult, BlastRadius, CraterResult, DamageZone, EarthquakeResult, EnergyResult,
        ExtractionReport, HistoricalComparison, ImpactEffectResult, ImpactParameters,
        ImpactRecord, RadiusSource, SessionSummary, Severity, ThermalResult, TsunamiResult,
    },
    session::{
        Coordinate, ExtractionRequest, ExtractionSession, SessionEvent, SessionStatus, Stage,
    },
};

// Re-export engine
pub use engine::ImpactEngine;

// Re-export pipeline components
pub use pipeline::{ExtractionOrchestrator, StageAccumulator};

// Re-export sources
pub use sources::{GuardedSource, JplSbdbSource};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

// Re-export testing utilities
pub use testing::{MockSources, RecordingStore};

// Re-export cancellation so callers need not depend on tokio-util directly
pub use tokio_util::sync::CancellationToken;
