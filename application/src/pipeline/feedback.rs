//! Feedback processor
//!
//! Ingests outcome signals keyed to a decision id and forwards each accepted
//! signal to the learning engine, closing the feedback → learning loop.
//! Feedback referencing an untracked decision is rejected with NotFound and
//! nothing is persisted. Uses the same offline-queue-and-flush pattern as
//! the tracker.

use crate::bus::EventBus;
use crate::pipeline::learning::LearningHandle;
use crate::pipeline::tracker::DecisionTracker;
use crate::ports::durable_store::{DurableStore, StoreRecord};
use agora_domain::{
    CategoryStats, CoordinationError, Event, EventKind, Feedback, FeedbackData, FeedbackFilter,
    OperatingMode,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct FeedbackInner {
    items: Vec<Feedback>,
    pending: Vec<StoreRecord>,
}

/// Ingests and aggregates outcome feedback
pub struct FeedbackProcessor {
    store: Arc<dyn DurableStore>,
    bus: Arc<EventBus>,
    tracker: Arc<DecisionTracker>,
    learning: LearningHandle,
    inner: Mutex<FeedbackInner>,
}

impl FeedbackProcessor {
    pub fn new(
        store: Arc<dyn DurableStore>,
        bus: Arc<EventBus>,
        tracker: Arc<DecisionTracker>,
        learning: LearningHandle,
    ) -> Self {
        Self {
            store,
            bus,
            tracker,
            learning,
            inner: Mutex::new(FeedbackInner {
                items: Vec::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// Submit feedback for a tracked decision. Returns the feedback id.
    ///
    /// The category is taken from the referenced decision, so callers cannot
    /// mislabel feedback. An unknown decision id is rejected before anything
    /// is persisted. Accepted feedback is forwarded to the learning engine,
    /// so the category's weights shift before the next proposal.
    pub async fn submit(
        &self,
        decision_id: &str,
        data: FeedbackData,
        mode: OperatingMode,
    ) -> Result<String, CoordinationError> {
        let decision = self
            .tracker
            .get(decision_id)
            .await
            .ok_or_else(|| CoordinationError::not_found("Decision", decision_id))?;

        let feedback = Feedback::new(decision_id, decision.category, data);
        let feedback_id = feedback.id.clone();
        debug!(decision = %decision_id, feedback = %feedback_id, quality = feedback.quality, "Feedback received");

        // Store I/O happens before the item lock is taken, never under it
        let record = StoreRecord::Feedback(feedback.clone());
        let queue_for_replay = if mode.is_constrained() {
            true
        } else if let Err(error) = self.store.persist(record.clone()).await {
            warn!(%error, "Store write failed, queueing feedback for replay");
            true
        } else {
            false
        };
        {
            let mut inner = self.inner.lock().await;
            if queue_for_replay {
                inner.pending.push(record);
            }
            inner.items.push(feedback.clone());
        }

        if let Err(error) = self.learning.learn(vec![feedback.clone()], mode).await {
            warn!(feedback = %feedback_id, %error, "Learning update failed");
        }

        self.bus.publish(Event::new(
            EventKind::FeedbackReceived,
            "feedback",
            json!({
                "feedback_id": feedback_id,
                "decision_id": decision_id,
                "category": feedback.category,
                "quality": feedback.quality,
            }),
        ));
        Ok(feedback_id)
    }

    /// Feedback matching the filter, in submission order.
    pub async fn retrieve(&self, filter: &FeedbackFilter) -> Vec<Feedback> {
        self.inner
            .lock()
            .await
            .items
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect()
    }

    /// Per-category quality/relevance means, computed on demand.
    pub async fn statistics(&self) -> HashMap<String, CategoryStats> {
        let inner = self.inner.lock().await;
        let mut stats: HashMap<String, CategoryStats> = HashMap::new();
        for feedback in &inner.items {
            stats
                .entry(feedback.category.clone())
                .or_default()
                .absorb(feedback);
        }
        stats
    }

    /// Replay queued writes; same contract as the tracker's flush. The lock
    /// is released before each store call.
    pub async fn flush_pending(&self) -> Result<usize, CoordinationError> {
        let queued = std::mem::take(&mut self.inner.lock().await.pending);
        let total = queued.len();
        let mut iter = queued.into_iter();
        while let Some(record) = iter.next() {
            if let Err(error) = self.store.persist(record.clone()).await {
                let mut remainder = vec![record];
                remainder.extend(iter);
                let mut inner = self.inner.lock().await;
                remainder.append(&mut inner.pending);
                inner.pending = remainder;
                return Err(CoordinationError::StoreUnavailable(error.to_string()));
            }
        }
        Ok(total)
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.pending.len()
    }
}
