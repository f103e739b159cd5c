//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{FactCache, ResultCache, SessionCache};
use crate::types::{
    facts::{FactRecord, SessionFacts},
    result::ImpactRecord,
    session::ExtractionSession,
};

/// In-memory storage for sessions, facts, and results.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, ExtractionSession>>,
    facts: RwLock<HashMap<(String, &'static str), FactRecord>>,
    results: RwLock<HashMap<String, ImpactRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            facts: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.sessions.write().unwrap().clear();
        self.facts.write().unwrap().clear();
        self.results.write().unwrap().clear();
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.read().unwrap().len()
    }

    pub fn result_count(&self) -> usize {
        self.results.read().unwrap().len()
    }
}

#[async_trait]
impl SessionCache for MemoryStore {
    async fn insert_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate {
                kind: "session".to_string(),
                session_id: session.id.clone(),
            });
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<ExtractionSession>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    async fn update_session(&self, session: &ExtractionSession) -> StoreResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        let stored = sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session.id.clone(),
            })?;

        if stored.is_terminal() {
            return Err(StoreError::TerminalSession {
                session_id: session.id.clone(),
                status: stored.status,
            });
        }

        *stored = session.clone();
        Ok(())
    }
}

#[async_trait]
impl FactCache for MemoryStore {
    async fn store_fact(&self, record: &FactRecord) -> StoreResult<()> {
        let key = (record.session_id.clone(), record.fact.kind());
        let mut facts = self.facts.write().unwrap();
        if facts.contains_key(&key) {
            return Err(StoreError::Duplicate {
                kind: record.fact.kind().to_string(),
                session_id: record.session_id.clone(),
            });
        }
        facts.insert(key, record.clone());
        Ok(())
    }

    async fn get_facts(&self, session_id: &str) -> StoreResult<SessionFacts> {
        let facts = self.facts.read().unwrap();
        let mut collected = SessionFacts::default();
        for record in facts.values().filter(|r| r.session_id == session_id) {
            collected.insert(record.fact.clone());
        }
        Ok(collected)
    }
}

#[async_trait]
impl ResultCache for MemoryStore {
    async fn store_result(&self, record: &ImpactRecord) -> StoreResult<()> {
        let mut results = self.results.write().unwrap();
        if results.contains_key(&record.session_id) {
            return Err(StoreError::Duplicate {
                kind: "result".to_string(),
                session_id: record.session_id.clone(),
            });
        }
        results.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn get_result(&self, session_id: &str) -> StoreResult<Option<ImpactRecord>> {
        Ok(self.results.read().unwrap().get(session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ImpactEngine;
    use crate::types::facts::{Fact, TopographySample};
    use crate::types::result::ImpactParameters;
    use crate::types::session::{ExtractionRequest, Stage};

    fn session() -> ExtractionSession {
        ExtractionSession::new(ExtractionRequest::new("Apophis", 0.0, 0.0))
    }

    #[tokio::test]
    async fn test_session_crud() {
        let store = MemoryStore::new();
        let mut s = session();

        store.insert_session(&s).await.unwrap();
        assert_eq!(store.session_count(), 1);

        s.start("step").unwrap();
        store.update_session(&s).await.unwrap();

        let retrieved = store.get_session(&s.id).await.unwrap().unwrap();
        assert_eq!(retrieved, s);

        assert!(store.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_session_rejected() {
        let store = MemoryStore::new();
        let s = session();
        store.insert_session(&s).await.unwrap();
        assert!(matches!(
            store.insert_session(&s).await,
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_session() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_session(&session()).await,
            Err(StoreError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminal_session_is_immutable() {
        let store = MemoryStore::new();
        let mut s = session();
        store.insert_session(&s).await.unwrap();
        s.fail(Stage::AsteroidFetch, "boom").unwrap();
        store.update_session(&s).await.unwrap();

        // A stale copy can't overwrite the terminal record
        let mut stale = s.clone();
        stale.status = crate::types::session::SessionStatus::InProgress;
        assert!(matches!(
            store.update_session(&stale).await,
            Err(StoreError::TerminalSession { .. })
        ));
        let stored = store.get_session(&s.id).await.unwrap().unwrap();
        assert!(stored.is_terminal());
    }

    #[tokio::test]
    async fn test_facts_keyed_by_session_and_kind() {
        let store = MemoryStore::new();
        let fact = Fact::Topography(TopographySample::new(12.0, "dem"));

        store.store_fact(&FactRecord::new("a", fact.clone())).await.unwrap();
        store.store_fact(&FactRecord::new("b", fact.clone())).await.unwrap();
        assert!(matches!(
            store.store_fact(&FactRecord::new("a", fact)).await,
            Err(StoreError::Duplicate { .. })
        ));

        let facts = store.get_facts("a").await.unwrap();
        assert_eq!(facts.topography.unwrap().elevation_m, 12.0);
        assert!(facts.asteroid.is_none());
        assert!(store.get_facts("c").await.unwrap().topography.is_none());
    }

    #[tokio::test]
    async fn test_result_once_per_session() {
        let store = MemoryStore::new();
        let result = ImpactEngine::default().compute(&ImpactParameters::for_diameter(50.0));
        let record = ImpactRecord::new("a", result);

        store.store_result(&record).await.unwrap();
        assert!(store.store_result(&record).await.is_err());
        assert_eq!(store.get_result("a").await.unwrap(), Some(record));
        assert_eq!(store.result_count(), 1);
    }

    #[test]
    fn test_clear_empties_every_table() {
        let store = MemoryStore::new();
        let s = session();
        let fact = Fact::Topography(TopographySample::new(12.0, "dem"));

        tokio_test::block_on(async {
            store.insert_session(&s).await.unwrap();
            store.store_fact(&FactRecord::new(&s.id, fact)).await.unwrap();
        });
        assert_eq!(store.fact_count(), 1);

        store.clear();
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.fact_count(), 0);
        assert!(tokio_test::block_on(store.get_session(&s.id))
            .unwrap()
            .is_none());
    }
}
