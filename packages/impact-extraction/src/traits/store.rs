//! Storage traits for sessions, facts, and results.
//!
//! The storage layer is split into focused traits:
//! - `SessionCache`: Session state records
//! - `FactCache`: Per-stage facts, one per category per session
//! - `ResultCache`: Impact results, one per session
//! - `SessionStore`: Composite trait combining all three
//!
//! Records reference their owning session by id only. Implementations must
//! apply each call atomically per key.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    facts::{FactRecord, SessionFacts},
    result::ImpactRecord,
    session::ExtractionSession,
};

/// Storage for session state records.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Insert a new session. Fails with `Duplicate` if the id exists.
    async fn insert_session(&self, session: &ExtractionSession) -> StoreResult<()>;

    /// Get a session by id.
    async fn get_session(&self, session_id: &str) -> StoreResult<Option<ExtractionSession>>;

    /// Replace the stored record with `session`.
    ///
    /// Fails with `SessionNotFound` if the id was never inserted and with
    /// `TerminalSession` if the stored record is already completed or failed.
    async fn update_session(&self, session: &ExtractionSession) -> StoreResult<()>;
}

/// Storage for per-stage facts.
#[async_trait]
pub trait FactCache: Send + Sync {
    /// Store a fact. Fails with `Duplicate` if the session already has a
    /// fact of the same category.
    async fn store_fact(&self, record: &FactRecord) -> StoreResult<()>;

    /// All facts stored for a session.
    async fn get_facts(&self, session_id: &str) -> StoreResult<SessionFacts>;
}

/// Storage for impact results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Store a result. Fails with `Duplicate` if one already exists.
    async fn store_result(&self, record: &ImpactRecord) -> StoreResult<()>;

    async fn get_result(&self, session_id: &str) -> StoreResult<Option<ImpactRecord>>;
}

/// Composite storage trait combining all caches.
///
/// This is the main trait used by the orchestrator.
pub trait SessionStore: SessionCache + FactCache + ResultCache {}

// Blanket implementation: anything implementing all three traits is a SessionStore
impl<T: SessionCache + FactCache + ResultCache> SessionStore for T {}
