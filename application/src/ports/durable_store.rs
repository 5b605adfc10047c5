//! Durable store port
//!
//! Abstract persist/query interface used by the Decision Tracker and
//! Feedback Processor. Schema and migrations are out of core scope; the
//! store only sees self-describing records.

use agora_domain::{Decision, DecisionStatus, Feedback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur against the durable store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached. Callers queue writes locally and flush
    /// on reconnect.
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A self-describing record persisted by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum StoreRecord {
    Decision(Decision),
    /// A lifecycle transition, written separately so replays are idempotent
    DecisionTransition {
        decision_id: String,
        status: DecisionStatus,
        at: u64,
    },
    Feedback(Feedback),
}

impl StoreRecord {
    /// Key the record belongs to (decision id for all current kinds)
    pub fn decision_id(&self) -> &str {
        match self {
            StoreRecord::Decision(d) => &d.id,
            StoreRecord::DecisionTransition { decision_id, .. } => decision_id,
            StoreRecord::Feedback(f) => &f.decision_id,
        }
    }
}

/// Filters for store queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreFilter {
    pub decision_id: Option<String>,
    pub category: Option<String>,
}

impl StoreFilter {
    pub fn matches(&self, record: &StoreRecord) -> bool {
        if let Some(id) = &self.decision_id
            && record.decision_id() != id
        {
            return false;
        }
        if let Some(category) = &self.category {
            let record_category = match record {
                StoreRecord::Decision(d) => Some(d.category.as_str()),
                StoreRecord::Feedback(f) => Some(f.category.as_str()),
                StoreRecord::DecisionTransition { .. } => None,
            };
            if record_category != Some(category.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Durable storage for pipeline entities
///
/// Replaying the same transition record must be a no-op for consumers, so
/// implementations may store duplicates.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn persist(&self, record: StoreRecord) -> Result<(), StoreError>;

    async fn query(&self, filter: StoreFilter) -> Result<Vec<StoreRecord>, StoreError>;
}
