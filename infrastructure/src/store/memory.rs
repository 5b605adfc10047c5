//! In-memory durable store
//!
//! Backing store for demos and tests. The reachability toggle simulates a
//! store outage so callers can exercise their offline-queue-and-flush path.

use agora_application::ports::durable_store::{DurableStore, StoreError, StoreFilter, StoreRecord};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable store held entirely in memory
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<StoreRecord>>,
    unreachable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage (or recovery) of the backing store.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn persist(&self, record: StoreRecord) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("store marked unreachable".into()));
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }

    async fn query(&self, filter: StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("store marked unreachable".into()));
        }
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_domain::{Decision, DecisionContext, DecisionOption};

    fn decision(category: &str) -> StoreRecord {
        StoreRecord::Decision(Decision::new(
            DecisionContext::new(category, "test decision"),
            DecisionOption::new("o1", 85.0, 0.1),
            0.8,
            "best value under budget",
        ))
    }

    #[tokio::test]
    async fn test_persist_and_query_by_category() {
        let store = InMemoryStore::new();
        store.persist(decision("pricing")).await.unwrap();
        store.persist(decision("listing")).await.unwrap();

        let found = store
            .query(StoreFilter {
                category: Some("pricing".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_rejects_writes() {
        let store = InMemoryStore::new();
        store.set_reachable(false);
        let err = store.persist(decision("pricing")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
        assert!(store.is_empty());

        store.set_reachable(true);
        store.persist(decision("pricing")).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
