//! Typed errors for the impact extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use std::time::Duration;

use thiserror::Error;

use crate::types::session::{SessionStatus, Stage};

/// Errors returned by the extraction orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request rejected before any session was created
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A pipeline stage failed; the session has been marked failed
    #[error("stage {stage} failed: {cause}")]
    Stage {
        stage: Stage,
        #[source]
        cause: StageFailure,
    },

    /// Unknown session id
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },

    /// Result requested before the session completed
    #[error("session {session_id} is not ready (status: {status})")]
    NotReady {
        session_id: String,
        status: SessionStatus,
    },

    /// Storage operation failed outside of a stage
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Illegal session state transition
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    /// The stage that failed, if this is a stage error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the run was aborted by a cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Stage {
                cause: StageFailure::Cancelled,
                ..
            }
        )
    }
}

/// Request parameters that fail validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("altitude must be a finite number, got {0}")]
    NonFiniteAltitude(f64),

    #[error("asteroid name must not be empty")]
    EmptyAsteroidName,
}

/// Why a stage failed.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// Upstream data source failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A source returned a record that cannot be used
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Persisting the stage output failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The caller cancelled the run
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by data-source adapters.
///
/// Every variant carries the identity of the source that failed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or non-success HTTP status
    #[error("{data_source}: request failed: {message}")]
    Http {
        data_source: String,
        message: String,
    },

    /// The call exceeded its timeout
    #[error("{data_source}: timed out after {timeout:?}")]
    Timeout {
        data_source: String,
        timeout: Duration,
    },

    /// Response body could not be parsed
    #[error("{data_source}: unparsable response: {message}")]
    Parse {
        data_source: String,
        message: String,
    },

    /// A required field was absent from the response
    #[error("{data_source}: missing required field `{field}`")]
    MissingField { data_source: String, field: String },

    /// A field was present but unusable
    #[error("{data_source}: invalid value for `{field}`: {message}")]
    InvalidValue {
        data_source: String,
        field: String,
        message: String,
    },

    /// The source has no record for the query
    #[error("{data_source}: no record for `{query}`")]
    NotFound { data_source: String, query: String },
}

impl SourceError {
    /// Identity of the failing source.
    pub fn data_source(&self) -> &str {
        match self {
            SourceError::Http { data_source, .. }
            | SourceError::Timeout { data_source, .. }
            | SourceError::Parse { data_source, .. }
            | SourceError::MissingField { data_source, .. }
            | SourceError::InvalidValue { data_source, .. }
            | SourceError::NotFound { data_source, .. } => data_source,
        }
    }

    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Http { .. } | SourceError::Timeout { .. })
    }

    pub(crate) fn missing(data_source: &str, field: impl Into<String>) -> Self {
        SourceError::MissingField {
            data_source: data_source.to_string(),
            field: field.into(),
        }
    }
}

/// Errors raised by session stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists
    #[error("duplicate {kind} for session {session_id}")]
    Duplicate { kind: String, session_id: String },

    /// Update targeted a session that was never inserted
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Update targeted a session already in a terminal state
    #[error("session {session_id} is {status} and can no longer change")]
    TerminalSession {
        session_id: String,
        status: SessionStatus,
    },

    /// A record that should exist for the session is absent
    #[error("no {kind} stored for session {session_id}")]
    MissingRecord { kind: String, session_id: String },

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Illegal session state transition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("cannot move session from {from} to {to}")]
    IllegalStatus {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("progress must increase: {current} -> {requested}")]
    ProgressNotIncreasing { current: f64, requested: f64 },

    #[error("progress {0} is only reachable on completion")]
    ProgressOutOfRange(f64),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value `{value}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
