//! The extraction orchestrator - drives a session through the five stages.

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::stage::{fetch_fact, StageAccumulator};
use crate::engine::ImpactEngine;
use crate::error::{PipelineError, Result, StageFailure, StoreError};
use crate::traits::sources::SourceSet;
use crate::traits::store::SessionStore;
use crate::types::{
    config::{FetchMode, PipelineConfig},
    facts::{Fact, FactRecord},
    result::{ExtractionReport, ImpactEffectResult, ImpactRecord, SessionSummary},
    session::{ExtractionRequest, ExtractionSession, SessionStatus, Stage},
};

/// Runs extraction requests against a set of sources and a store.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = ExtractionOrchestrator::new(MemoryStore::new(), sources);
///
/// // One call, start to finish
/// let result = orchestrator.run(ExtractionRequest::new("Apophis", 35.0, 139.0)).await?;
///
/// // Or start now, execute in the background, and poll
/// let id = orchestrator.start(request).await?;
/// tokio::spawn(async move { orchestrator.execute(&id, CancellationToken::new()).await });
/// ```
pub struct ExtractionOrchestrator<S: SessionStore> {
    store: S,
    sources: SourceSet,
    engine: ImpactEngine,
    config: PipelineConfig,
}

impl<S: SessionStore> ExtractionOrchestrator<S> {
    /// Create an orchestrator with the default configuration.
    pub fn new(store: S, sources: SourceSet) -> Self {
        Self::with_config(store, sources, PipelineConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(store: S, sources: SourceSet, config: PipelineConfig) -> Self {
        Self {
            store,
            sources,
            engine: ImpactEngine::new(config.asteroid_density_kg_m3),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate, run every stage and return the impact result.
    pub async fn run(&self, request: ExtractionRequest) -> Result<ImpactEffectResult> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), aborting when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: ExtractionRequest,
        cancel: CancellationToken,
    ) -> Result<ImpactEffectResult> {
        let session_id = self.start(request).await?;
        self.execute(&session_id, cancel).await
    }

    /// Validate the request and create a pending session.
    ///
    /// Invalid requests are rejected before anything is stored.
    pub async fn start(&self, request: ExtractionRequest) -> Result<String> {
        request.validate()?;

        let session = ExtractionSession::new(request);
        self.store.insert_session(&session).await?;

        info!(
            session_id = %session.id,
            asteroid = %session.request.asteroid_name,
            latitude = session.request.coordinate.latitude,
            longitude = session.request.coordinate.longitude,
            "Extraction session created"
        );
        Ok(session.id)
    }

    /// Run a pending session to completion or failure.
    #[instrument(name = "extraction", skip_all, fields(session_id = %session_id))]
    pub async fn execute(
        &self,
        session_id: &str,
        cancel: CancellationToken,
    ) -> Result<ImpactEffectResult> {
        let mut session = self.get_status(session_id).await?;

        session.start(Stage::AsteroidFetch.label())?;

        match self.drive(&mut session, &cancel).await {
            Ok(result) => {
                info!(
                    elapsed_seconds = session.elapsed_seconds.unwrap_or_default(),
                    megatons = result.energy.megatons_tnt,
                    "Extraction completed"
                );
                Ok(result)
            }
            Err(err) => {
                self.record_failure(&mut session, &err).await;
                Err(err)
            }
        }
    }

    /// Current session record.
    pub async fn get_status(&self, session_id: &str) -> Result<ExtractionSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Facts and result of a completed session.
    pub async fn get_result(&self, session_id: &str) -> Result<ExtractionReport> {
        let session = self.get_status(session_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(PipelineError::NotReady {
                session_id: session_id.to_string(),
                status: session.status,
            });
        }

        let missing = |kind: &str| StoreError::MissingRecord {
            kind: kind.to_string(),
            session_id: session_id.to_string(),
        };

        let facts = self.store.get_facts(session_id).await?;
        let record = self
            .store
            .get_result(session_id)
            .await?
            .ok_or_else(|| missing("result"))?;

        Ok(ExtractionReport {
            session: SessionSummary::from(&session),
            asteroid: facts.asteroid.ok_or_else(|| missing("asteroid"))?,
            topography: facts.topography.ok_or_else(|| missing("topography"))?,
            geological: facts.geology.ok_or_else(|| missing("geology"))?,
            regional: facts.regional.ok_or_else(|| missing("regional"))?,
            impact_calculation: record.result,
        })
    }

    /// Mark the session failed and persist it. Persistence problems are
    /// logged; the caller still gets the original error.
    async fn record_failure(&self, session: &mut ExtractionSession, err: &PipelineError) {
        let stage = err.stage().unwrap_or_else(|| stage_of(session));
        error!(stage = %stage, error = %err, "Extraction failed");

        if let Err(e) = session.fail(stage, err.to_string()) {
            warn!(error = %e, "Session already terminal, failure not recorded");
            return;
        }
        if let Err(e) = self.store.update_session(session).await {
            error!(error = %e, "Failed to persist failed session");
        }
    }

    async fn drive(
        &self,
        session: &mut ExtractionSession,
        cancel: &CancellationToken,
    ) -> Result<ImpactEffectResult> {
        self.store.update_session(session).await?;
        info!(mode = ?self.config.fetch_mode, "Extraction started");

        let mut acc = StageAccumulator::new();

        match self.config.fetch_mode {
            FetchMode::Sequential => self.fetch_sequential(session, &mut acc, cancel).await?,
            FetchMode::Concurrent => self.fetch_concurrent(session, &mut acc, cancel).await?,
        }

        self.compute(session, acc, cancel).await
    }

    async fn fetch_sequential(
        &self,
        session: &mut ExtractionSession,
        acc: &mut StageAccumulator,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for stage in Stage::FETCHES {
            debug!(stage = %stage, "Stage starting");
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StageFailure::Cancelled),
                fact = fetch_fact(stage, &self.sources, &session.request) => fact,
            };
            let fact = fetched.map_err(|cause| PipelineError::Stage { stage, cause })?;
            self.commit_fact(session, acc, fact).await?;
        }
        Ok(())
    }

    /// All four fetches in flight; each is committed as it lands.
    async fn fetch_concurrent(
        &self,
        session: &mut ExtractionSession,
        acc: &mut StageAccumulator,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = session.request.clone();
        let sources = &self.sources;
        let mut pending: FuturesUnordered<_> = Stage::FETCHES
            .into_iter()
            .map(|stage| {
                let request = &request;
                async move { (stage, fetch_fact(stage, sources, request).await) }
            })
            .collect();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(PipelineError::Stage {
                        stage: acc.next_stage(),
                        cause: StageFailure::Cancelled,
                    });
                }
                next = pending.next() => next,
            };

            let Some((stage, fetched)) = next else {
                return Ok(());
            };
            let fact = fetched.map_err(|cause| PipelineError::Stage { stage, cause })?;
            self.commit_fact(session, acc, fact).await?;
        }
    }

    /// Persist a fact and advance the session by one checkpoint.
    async fn commit_fact(
        &self,
        session: &mut ExtractionSession,
        acc: &mut StageAccumulator,
        mut fact: Fact,
    ) -> Result<()> {
        let stage = fact.stage();
        let storage = |e: StoreError| PipelineError::Stage {
            stage,
            cause: StageFailure::Storage(e),
        };

        if let Fact::Regional(regional) = &mut fact {
            for section in regional.fill_defaults() {
                warn!(section, "Regional data unavailable, using defaults");
                session.warn(
                    Some(stage),
                    format!("{} data unavailable, using defaults", section),
                );
            }
        }

        self.store
            .store_fact(&FactRecord::new(session.id.clone(), fact.clone()))
            .await
            .map_err(storage)?;

        session.record_source(fact.source());
        acc.record(fact);

        let progress = acc.progress();
        session.advance(progress, acc.next_stage().label())?;
        self.store.update_session(session).await.map_err(storage)?;

        info!(stage = %stage, progress, "Stage complete");
        Ok(())
    }

    async fn compute(
        &self,
        session: &mut ExtractionSession,
        acc: StageAccumulator,
        cancel: &CancellationToken,
    ) -> Result<ImpactEffectResult> {
        let stage = Stage::ImpactCompute;
        let failed = |cause: StageFailure| PipelineError::Stage { stage, cause };

        if cancel.is_cancelled() {
            return Err(failed(StageFailure::Cancelled));
        }

        let facts = acc.finish().map_err(failed)?;
        let params = facts.parameters(self.engine.asteroid_density_kg_m3());
        let result = self.engine.compute(&params);

        self.store
            .store_result(&ImpactRecord::new(session.id.clone(), result.clone()))
            .await
            .map_err(|e| failed(StageFailure::Storage(e)))?;

        // Adopt the completed state only once it is persisted.
        let mut completed = session.clone();
        completed.complete()?;
        self.store
            .update_session(&completed)
            .await
            .map_err(|e| failed(StageFailure::Storage(e)))?;
        *session = completed;

        info!(
            stage = %stage,
            crater_km = result.crater.diameter_km,
            tsunami = result.tsunami.is_some(),
            "Stage complete"
        );
        Ok(result)
    }
}

/// Stage a session was working on, judged from its progress.
fn stage_of(session: &ExtractionSession) -> Stage {
    Stage::ALL
        .into_iter()
        .find(|stage| stage.checkpoint() > session.progress)
        .unwrap_or(Stage::ImpactCompute)
}
