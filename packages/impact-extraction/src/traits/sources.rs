//! Data-source adapter traits.
//!
//! Each adapter fetches and normalizes one category of fact. Adapters never
//! retry on their own; wrap them in [`GuardedSource`](crate::sources::GuardedSource)
//! for timeouts and bounded retry.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SourceResult;
use crate::types::facts::{
    AsteroidPhysicalData, GeologicalSample, RegionalContext, TopographySample,
};
use crate::types::session::Coordinate;

/// Asteroid catalog lookup by name or designation.
#[async_trait]
pub trait AsteroidSource: Send + Sync {
    /// Stable identifier recorded in session `data_sources`.
    fn source_id(&self) -> &str;

    async fn fetch_asteroid(&self, name: &str) -> SourceResult<AsteroidPhysicalData>;
}

/// Elevation at a coordinate.
#[async_trait]
pub trait TopographySource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch_topography(&self, coordinate: &Coordinate) -> SourceResult<TopographySample>;
}

/// Surface geology at a coordinate.
#[async_trait]
pub trait GeologySource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch_geology(&self, coordinate: &Coordinate) -> SourceResult<GeologicalSample>;
}

/// Faults, bathymetry, population and infrastructure around a coordinate.
#[async_trait]
pub trait RegionalSource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch_regional(&self, coordinate: &Coordinate) -> SourceResult<RegionalContext>;
}

#[async_trait]
impl<T: AsteroidSource + ?Sized> AsteroidSource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    async fn fetch_asteroid(&self, name: &str) -> SourceResult<AsteroidPhysicalData> {
        (**self).fetch_asteroid(name).await
    }
}

#[async_trait]
impl<T: TopographySource + ?Sized> TopographySource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    async fn fetch_topography(&self, coordinate: &Coordinate) -> SourceResult<TopographySample> {
        (**self).fetch_topography(coordinate).await
    }
}

#[async_trait]
impl<T: GeologySource + ?Sized> GeologySource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    async fn fetch_geology(&self, coordinate: &Coordinate) -> SourceResult<GeologicalSample> {
        (**self).fetch_geology(coordinate).await
    }
}

#[async_trait]
impl<T: RegionalSource + ?Sized> RegionalSource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    async fn fetch_regional(&self, coordinate: &Coordinate) -> SourceResult<RegionalContext> {
        (**self).fetch_regional(coordinate).await
    }
}

/// The four adapters a pipeline runs against.
#[derive(Clone)]
pub struct SourceSet {
    pub asteroid: Arc<dyn AsteroidSource>,
    pub topography: Arc<dyn TopographySource>,
    pub geology: Arc<dyn GeologySource>,
    pub regional: Arc<dyn RegionalSource>,
}

impl SourceSet {
    pub fn new(
        asteroid: impl AsteroidSource + 'static,
        topography: impl TopographySource + 'static,
        geology: impl GeologySource + 'static,
        regional: impl RegionalSource + 'static,
    ) -> Self {
        Self {
            asteroid: Arc::new(asteroid),
            topography: Arc::new(topography),
            geology: Arc::new(geology),
            regional: Arc::new(regional),
        }
    }

    /// Use one value implementing all four traits for every category.
    pub fn shared<T>(source: Arc<T>) -> Self
    where
        T: AsteroidSource + TopographySource + GeologySource + RegionalSource + 'static,
    {
        Self {
            asteroid: source.clone(),
            topography: source.clone(),
            geology: source.clone(),
            regional: source,
        }
    }
}
