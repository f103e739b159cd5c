//! Configuration for the pipeline and its data sources.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::result::DEFAULT_ASTEROID_DENSITY;

/// How the four fact-gathering stages are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One stage at a time, in fixed order
    #[default]
    Sequential,
    /// All four fetches in flight at once, joined before the compute stage
    Concurrent,
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(FetchMode::Sequential),
            "concurrent" => Ok(FetchMode::Concurrent),
            other => Err(format!("expected `sequential` or `concurrent`, got `{}`", other)),
        }
    }
}

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Impactor density handed to the engine.
    ///
    /// Not fetched from any source. Default: 3000 kg/m³.
    pub asteroid_density_kg_m3: f64,

    /// Scheduling of the fetch stages.
    ///
    /// Default: sequential.
    pub fetch_mode: FetchMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            asteroid_density_kg_m3: DEFAULT_ASTEROID_DENSITY,
            fetch_mode: FetchMode::Sequential,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asteroid_density(mut self, density_kg_m3: f64) -> Self {
        self.asteroid_density_kg_m3 = density_kg_m3;
        self
    }

    pub fn with_fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }

    /// Load overrides from the environment (and `.env` if present).
    ///
    /// Reads `IMPACT_ASTEROID_DENSITY` and `IMPACT_FETCH_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(density) = parse_var::<f64, _>(&lookup, "IMPACT_ASTEROID_DENSITY")? {
            if !(density.is_finite() && density > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: "IMPACT_ASTEROID_DENSITY".to_string(),
                    value: density.to_string(),
                    reason: "must be a positive number".to_string(),
                });
            }
            config.asteroid_density_kg_m3 = density;
        }

        if let Some(mode) = parse_var::<FetchMode, _>(&lookup, "IMPACT_FETCH_MODE")? {
            config.fetch_mode = mode;
        }

        Ok(config)
    }
}

/// Per-source call policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Upper bound on a single call.
    pub timeout: Duration,

    /// Retries after the first attempt. Default: 0.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl SourceConfig {
    /// Defaults for the asteroid catalog.
    pub fn asteroid() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            ..Default::default()
        }
    }

    /// Defaults for raster and survey sources.
    pub fn geospatial() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }

    /// Apply `<PREFIX>_TIMEOUT_SECS` and `<PREFIX>_MAX_RETRIES` overrides.
    pub fn from_env(prefix: &str, base: Self) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(prefix, base, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, base: Self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = base;
        let timeout_key = format!("{}_TIMEOUT_SECS", prefix);
        let retries_key = format!("{}_MAX_RETRIES", prefix);

        if let Some(secs) = parse_var::<u64, _>(&lookup, &timeout_key)? {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: timeout_key,
                    value: secs.to_string(),
                    reason: "timeout must be at least one second".to_string(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, &retries_key)? {
            config.max_retries = retries;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
