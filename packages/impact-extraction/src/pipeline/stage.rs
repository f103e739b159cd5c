//! Stage execution and the fact accumulator threaded through a run.
//!
//! Each fetch stage is a typed `Result<Fact, StageFailure>`; successful facts
//! are folded into a [`StageAccumulator`], which the compute stage turns into
//! engine parameters once all four categories are present.

use crate::error::StageFailure;
use crate::traits::sources::SourceSet;
use crate::types::facts::{
    AsteroidPhysicalData, Fact, GeologicalSample, RegionalContext, SessionFacts, TopographySample,
};
use crate::types::result::ImpactParameters;
use crate::types::session::{ExtractionRequest, Stage};

/// Run one fetch stage against its adapter and validate the record.
pub async fn fetch_fact(
    stage: Stage,
    sources: &SourceSet,
    request: &ExtractionRequest,
) -> Result<Fact, StageFailure> {
    let coordinate = &request.coordinate;
    let fact = match stage {
        Stage::AsteroidFetch => Fact::Asteroid(
            sources
                .asteroid
                .fetch_asteroid(&request.asteroid_name)
                .await?,
        ),
        Stage::TopographyFetch => {
            Fact::Topography(sources.topography.fetch_topography(coordinate).await?)
        }
        Stage::GeologyFetch => Fact::Geology(sources.geology.fetch_geology(coordinate).await?),
        Stage::RegionalFetch => Fact::Regional(sources.regional.fetch_regional(coordinate).await?),
        Stage::ImpactCompute => {
            return Err(StageFailure::InvalidData(
                "impact-compute has no data source".to_string(),
            ))
        }
    };

    validate_fact(&fact).map_err(StageFailure::InvalidData)?;
    Ok(fact)
}

fn validate_fact(fact: &Fact) -> Result<(), String> {
    match fact {
        Fact::Asteroid(asteroid) => asteroid.validate(),
        Fact::Topography(topography) => topography.validate(),
        Fact::Geology(geology) => geology.validate(),
        Fact::Regional(_) => Ok(()),
    }
}

/// The four facts of a run, all present.
#[derive(Debug, Clone)]
pub struct CompleteFacts {
    pub asteroid: AsteroidPhysicalData,
    pub topography: TopographySample,
    pub geology: GeologicalSample,
    pub regional: RegionalContext,
}

impl CompleteFacts {
    /// Engine inputs for these facts.
    pub fn parameters(&self, asteroid_density_kg_m3: f64) -> ImpactParameters {
        ImpactParameters::from_facts(
            &self.asteroid,
            &self.topography,
            &self.geology,
            &self.regional,
            asteroid_density_kg_m3,
        )
    }
}

impl TryFrom<SessionFacts> for CompleteFacts {
    type Error = Stage;

    /// Fails with the first stage whose fact is missing.
    fn try_from(facts: SessionFacts) -> Result<Self, Self::Error> {
        Ok(Self {
            asteroid: facts.asteroid.ok_or(Stage::AsteroidFetch)?,
            topography: facts.topography.ok_or(Stage::TopographyFetch)?,
            geology: facts.geology.ok_or(Stage::GeologyFetch)?,
            regional: facts.regional.ok_or(Stage::RegionalFetch)?,
        })
    }
}

/// Facts collected so far in a run.
#[derive(Debug, Default)]
pub struct StageAccumulator {
    facts: SessionFacts,
    completed: Vec<Stage>,
}

impl StageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fact: Fact) {
        let stage = fact.stage();
        if !self.completed.contains(&stage) {
            self.completed.push(stage);
        }
        self.facts.insert(fact);
    }

    /// Number of fetch stages completed.
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Fetch stages completed, in completion order.
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// Progress reached after the fetches recorded so far.
    ///
    /// Checkpoints advance by count, so concurrent runs still report
    /// 20, 40, 60, 80 whatever order the fetches finish in.
    pub fn progress(&self) -> f64 {
        match self.completed.len() {
            0 => 0.0,
            n => Stage::FETCHES[(n - 1).min(Stage::FETCHES.len() - 1)].checkpoint(),
        }
    }

    /// Earliest fetch stage not yet completed, or the compute stage.
    pub fn next_stage(&self) -> Stage {
        Stage::FETCHES
            .into_iter()
            .find(|stage| !self.completed.contains(stage))
            .unwrap_or(Stage::ImpactCompute)
    }

    /// Hand over the collected facts for the compute stage.
    pub fn finish(self) -> Result<CompleteFacts, StageFailure> {
        CompleteFacts::try_from(self.facts).map_err(|missing| {
            StageFailure::InvalidData(format!("no fact collected by {}", missing))
        })
    }
}
