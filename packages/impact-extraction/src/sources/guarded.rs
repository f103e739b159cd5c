//! Timeout and retry wrapper for data sources.
//!
//! Wraps any source implementation with a per-call timeout and, when
//! configured, bounded retry with exponential backoff on transient errors.

use async_trait::async_trait;
use std::future::Future;
use tracing::warn;

use crate::error::{SourceError, SourceResult};
use crate::traits::sources::{AsteroidSource, GeologySource, RegionalSource, TopographySource};
use crate::types::config::SourceConfig;
use crate::types::facts::{
    AsteroidPhysicalData, GeologicalSample, RegionalContext, TopographySample,
};
use crate::types::session::Coordinate;

/// A source wrapper that enforces a call policy.
pub struct GuardedSource<S> {
    inner: S,
    config: SourceConfig,
}

impl<S> GuardedSource<S> {
    pub fn new(inner: S, config: SourceConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, source_id: &str, op: F) -> SourceResult<T>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = SourceResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let error = match tokio::time::timeout(self.config.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => SourceError::Timeout {
                    data_source: source_id.to_string(),
                    timeout: self.config.timeout,
                },
            };

            if !error.is_retryable() || attempt >= self.config.max_retries {
                return Err(error);
            }

            attempt += 1;
            let backoff = self.config.backoff_for(attempt);
            warn!(
                source = %source_id,
                attempt,
                max_retries = self.config.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retrying source call"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

#[async_trait]
impl<S: AsteroidSource> AsteroidSource for GuardedSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_asteroid(&self, name: &str) -> SourceResult<AsteroidPhysicalData> {
        self.call(self.inner.source_id(), || self.inner.fetch_asteroid(name))
            .await
    }
}

#[async_trait]
impl<S: TopographySource> TopographySource for GuardedSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_topography(&self, coordinate: &Coordinate) -> SourceResult<TopographySample> {
        self.call(self.inner.source_id(), || {
            self.inner.fetch_topography(coordinate)
        })
        .await
    }
}

#[async_trait]
impl<S: GeologySource> GeologySource for GuardedSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_geology(&self, coordinate: &Coordinate) -> SourceResult<GeologicalSample> {
        self.call(self.inner.source_id(), || self.inner.fetch_geology(coordinate))
            .await
    }
}

#[async_trait]
impl<S: RegionalSource> RegionalSource for GuardedSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_regional(&self, coordinate: &Coordinate) -> SourceResult<RegionalContext> {
        self.call(self.inner.source_id(), || self.inner.fetch_regional(coordinate))
            .await
    }
}
