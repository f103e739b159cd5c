//! SQLite storage implementation.
//!
//! A file-based storage backend using SQLite. Records are stored as JSON
//! payloads alongside the key and status columns needed for lookups.
//! Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{FactCache, ResultCache, SessionCache};
use crate::types::{
    facts::{FactRecord, SessionFacts},
    result::ImpactRecord,
    session::{ExtractionSession, SessionStatus},
};

/// SQLite-based session store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

/// Map a unique-constraint violation to `Duplicate`.
fn insert_error(e: sqlx::Error, kind: &str, session_id: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
            kind: kind.to_string(),
            session_id: session_id.to_string(),
        },
        _ => backend(e),
    }
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./impact.db?mode=rwc` - Create if not exists
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        Self::connect(database_url, 5).await
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Uses a single connection; each connection to `:memory:` would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS facts (
                session_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (session_id, kind)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                session_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                calculated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct PayloadRow {
    payload: String,
}

#[async_trait]
impl SessionCache for SqliteStore {
    async fn insert_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        let payload = serde_json::to_string(session)?;

        sqlx::query(
            "INSERT INTO sessions (id, status, payload, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.status.as_str())
        .bind(&payload)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "session", &session.id))?;

        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<ExtractionSession>> {
        let row = sqlx::query_as::<_, PayloadRow>("SELECT payload FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(r) => Ok(Some(serde_json::from_str(&r.payload)?)),
            None => Ok(None),
        }
    }

    async fn update_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        let payload = serde_json::to_string(session)?;

        // Guarded write: terminal rows never match.
        let updated = sqlx::query(
            r#"
            UPDATE sessions
            SET status = ?, payload = ?, updated_at = ?
            WHERE id = ? AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(session.status.as_str())
        .bind(&payload)
        .bind(session.updated_at.to_rfc3339())
        .bind(&session.id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if updated.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_session(&session.id).await? {
            None => Err(StoreError::SessionNotFound {
                session_id: session.id.clone(),
            }),
            Some(stored) => Err(StoreError::TerminalSession {
                session_id: session.id.clone(),
                status: stored.status,
            }),
        }
    }
}

#[async_trait]
impl FactCache for SqliteStore {
    async fn store_fact(&self, record: &FactRecord) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        let kind = record.fact.kind();

        sqlx::query("INSERT INTO facts (session_id, kind, payload, stored_at) VALUES (?, ?, ?, ?)")
            .bind(&record.session_id)
            .bind(kind)
            .bind(&payload)
            .bind(record.stored_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, kind, &record.session_id))?;

        Ok(())
    }

    async fn get_facts(&self, session_id: &str) -> StoreResult<SessionFacts> {
        let rows = sqlx::query_as::<_, PayloadRow>("SELECT payload FROM facts WHERE session_id = ?")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let mut facts = SessionFacts::default();
        for row in rows {
            let record: FactRecord = serde_json::from_str(&row.payload)?;
            facts.insert(record.fact);
        }
        Ok(facts)
    }
}

#[async_trait]
impl ResultCache for SqliteStore {
    async fn store_result(&self, record: &ImpactRecord) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;

        sqlx::query("INSERT INTO results (session_id, payload, calculated_at) VALUES (?, ?, ?)")
            .bind(&record.session_id)
            .bind(&payload)
            .bind(record.calculated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, "result", &record.session_id))?;

        Ok(())
    }

    async fn get_result(&self, session_id: &str) -> StoreResult<Option<ImpactRecord>> {
        let row = sqlx::query_as::<_, PayloadRow>("SELECT payload FROM results WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(r) => Ok(Some(serde_json::from_str(&r.payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImpactEngine;
    use crate::types::facts::{Fact, GeologicalSample};
    use crate::types::result::ImpactParameters;
    use crate::types::session::{ExtractionRequest, Stage};

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_update() {
        let store = test_store().await;
        let mut session = ExtractionSession::new(ExtractionRequest::new("Bennu", 1.0, 2.0));
        store.insert_session(&session).await.unwrap();

        session.start("asteroid").unwrap();
        session.advance(20.0, "topography").unwrap();
        store.update_session(&session).await.unwrap();

        let retrieved = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(retrieved.status, SessionStatus::InProgress);
        assert_eq!(retrieved.progress, 20.0);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_sessions() {
        let store = test_store().await;
        let session = ExtractionSession::new(ExtractionRequest::new("Bennu", 1.0, 2.0));

        assert!(matches!(
            store.update_session(&session).await,
            Err(StoreError::SessionNotFound { .. })
        ));

        store.insert_session(&session).await.unwrap();
        assert!(matches!(
            store.insert_session(&session).await,
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminal_session_rejects_update() {
        let store = test_store().await;
        let mut session = ExtractionSession::new(ExtractionRequest::new("Bennu", 1.0, 2.0));
        store.insert_session(&session).await.unwrap();
        session.fail(Stage::AsteroidFetch, "unreachable").unwrap();
        store.update_session(&session).await.unwrap();

        assert!(matches!(
            store.update_session(&session).await,
            Err(StoreError::TerminalSession {
                status: SessionStatus::Failed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_facts_and_results() {
        let store = test_store().await;
        let geology = Fact::Geology(GeologicalSample::from_description("basalt flows", "USGS"));
        store.store_fact(&FactRecord::new("s1", geology.clone())).await.unwrap();
        assert!(store.store_fact(&FactRecord::new("s1", geology)).await.is_err());

        let facts = store.get_facts("s1").await.unwrap();
        assert_eq!(facts.geology.unwrap().density_kg_m3, 2850.0);

        let result = ImpactEngine::default().compute(&ImpactParameters::for_diameter(20.0));
        let record = ImpactRecord::new("s1", result.clone());
        store.store_result(&record).await.unwrap();
        let stored = store.get_result("s1").await.unwrap().unwrap();
        assert!((stored.result.crater.diameter_m - result.crater.diameter_m).abs() < 1e-6);
        assert!(store.get_result("s2").await.unwrap().is_none());
    }
}
