//! Decision tracker
//!
//! Durable lifecycle state machine for decisions, with on-demand metrics.
//! Every transition goes through one guarded map, so no two execution paths
//! can advance the same decision concurrently; store writes happen after the
//! map lock is released, so store latency never blocks reads or unrelated
//! transitions. Writes that fail because the durable store is unreachable
//! are queued locally and flushed on reconnect; replaying the same
//! (id, status) transition is a no-op.

use crate::bus::EventBus;
use crate::ports::durable_store::{DurableStore, StoreRecord};
use agora_domain::{
    CoordinationError, Decision, DecisionStatus, Event, EventKind, EventPriority, OperatingMode,
    util::current_timestamp,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// On-demand snapshot of tracked decisions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerMetrics {
    pub total: usize,
    pub by_status: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub avg_confidence: f64,
}

struct TrackerInner {
    decisions: HashMap<String, Decision>,
    /// Writes awaiting a reachable store
    pending: Vec<StoreRecord>,
}

/// Durable lifecycle state machine for decisions
pub struct DecisionTracker {
    store: Arc<dyn DurableStore>,
    bus: Arc<EventBus>,
    inner: Mutex<TrackerInner>,
}

impl DecisionTracker {
    pub fn new(store: Arc<dyn DurableStore>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            inner: Mutex::new(TrackerInner {
                decisions: HashMap::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// Register a decision in its initial state. Tracking the same decision
    /// twice is a no-op.
    pub async fn track(&self, decision: Decision, mode: OperatingMode) {
        let record = StoreRecord::Decision(decision.clone());
        {
            let mut inner = self.inner.lock().await;
            if inner.decisions.contains_key(&decision.id) {
                return;
            }
            inner.decisions.insert(decision.id.clone(), decision);
        }
        self.write_through(record, mode).await;
    }

    /// Advance a decision's lifecycle, enforcing the legal transition graph.
    ///
    /// Illegal moves return `TransitionViolation`; re-applying the current
    /// status is an idempotent no-op.
    pub async fn update_status(
        &self,
        decision_id: &str,
        status: DecisionStatus,
        mode: OperatingMode,
    ) -> Result<(), CoordinationError> {
        let category = {
            let mut inner = self.inner.lock().await;
            let decision = inner
                .decisions
                .get_mut(decision_id)
                .ok_or_else(|| CoordinationError::not_found("Decision", decision_id))?;

            let changed = decision.apply_status(status)?;
            if !changed {
                debug!(decision = %decision_id, status = %status, "Transition replay ignored");
                return Ok(());
            }
            decision.category.clone()
        };

        let record = StoreRecord::DecisionTransition {
            decision_id: decision_id.to_string(),
            status,
            at: current_timestamp(),
        };
        self.write_through(record, mode).await;

        self.bus.publish(
            Event::new(
                EventKind::DecisionStatus,
                "tracker",
                json!({
                    "decision_id": decision_id,
                    "status": status.as_str(),
                    "category": category,
                }),
            )
            .with_priority(if status == DecisionStatus::Failed {
                EventPriority::High
            } else {
                EventPriority::Normal
            }),
        );
        Ok(())
    }

    pub async fn get(&self, decision_id: &str) -> Option<Decision> {
        self.inner.lock().await.decisions.get(decision_id).cloned()
    }

    pub async fn decisions_by_status(&self, status: DecisionStatus) -> Vec<Decision> {
        self.inner
            .lock()
            .await
            .decisions
            .values()
            .filter(|d| d.status == status)
            .cloned()
            .collect()
    }

    /// Compute metrics on demand rather than continuously materializing.
    pub async fn metrics(&self) -> TrackerMetrics {
        let inner = self.inner.lock().await;
        let total = inner.decisions.len();
        let mut by_status: HashMap<String, usize> = HashMap::new();
        let mut by_category: HashMap<String, usize> = HashMap::new();
        let mut confidence_sum = 0.0;

        for decision in inner.decisions.values() {
            *by_status.entry(decision.status.as_str().to_string()).or_default() += 1;
            *by_category.entry(decision.category.clone()).or_default() += 1;
            confidence_sum += decision.confidence;
        }

        TrackerMetrics {
            total,
            by_status,
            by_category,
            avg_confidence: if total == 0 {
                0.0
            } else {
                confidence_sum / total as f64
            },
        }
    }

    /// Replay queued writes against the store. Returns how many flushed;
    /// stops (leaving the rest queued) at the first store failure.
    ///
    /// The queue lock is not held across store calls, so transitions and
    /// reads proceed while a flush is in flight.
    pub async fn flush_pending(&self) -> Result<usize, CoordinationError> {
        let queued = std::mem::take(&mut self.inner.lock().await.pending);
        let total = queued.len();
        let mut flushed = 0;
        let mut iter = queued.into_iter();
        while let Some(record) = iter.next() {
            if let Err(error) = self.store.persist(record.clone()).await {
                let mut remainder = vec![record];
                remainder.extend(iter);
                // Replay order stays ahead of writes queued during the flush
                let mut inner = self.inner.lock().await;
                remainder.append(&mut inner.pending);
                inner.pending = remainder;
                warn!(flushed, "Flush interrupted, store still unreachable");
                return Err(CoordinationError::StoreUnavailable(error.to_string()));
            }
            flushed += 1;
        }
        debug!(flushed = total, "Pending tracker writes flushed");
        Ok(total)
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    /// Write through to the store, or queue locally. Constrained mode defers
    /// every write to the queue so flushes can be batched off the hot path.
    ///
    /// Called with the map lock released: a slow store stalls only this
    /// write, never reads or transitions of other decisions.
    async fn write_through(&self, record: StoreRecord, mode: OperatingMode) {
        if mode.is_constrained() {
            self.inner.lock().await.pending.push(record);
            return;
        }
        if let Err(error) = self.store.persist(record.clone()).await {
            warn!(%error, "Store write failed, queueing for replay");
            self.inner.lock().await.pending.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::durable_store::{StoreError, StoreFilter};
    use agora_domain::{DecisionContext, DecisionOption};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// In-memory store whose reachability can be toggled.
    struct ToggleStore {
        records: Mutex<Vec<StoreRecord>>,
        reachable: AtomicBool,
    }

    impl ToggleStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
                reachable: AtomicBool::new(true),
            })
        }

        fn set_reachable(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::SeqCst);
        }

        async fn count(&self) -> usize {
            self.records.lock().await.len()
        }
    }

    #[async_trait]
    impl DurableStore for ToggleStore {
        async fn persist(&self, record: StoreRecord) -> Result<(), StoreError> {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(StoreError::Unreachable("simulated outage".into()));
            }
            self.records.lock().await.push(record);
            Ok(())
        }

        async fn query(&self, filter: StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect())
        }
    }

    fn decision() -> Decision {
        Decision::new(
            DecisionContext::new("pricing", "reprice"),
            DecisionOption::new("o1", 85.0, 0.1),
            0.8,
            "best value under budget",
        )
    }

    fn tracker(store: Arc<ToggleStore>) -> DecisionTracker {
        DecisionTracker::new(store, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn test_track_and_advance() {
        let store = ToggleStore::new();
        let tracker = tracker(Arc::clone(&store));
        let d = decision();
        let id = d.id.clone();

        tracker.track(d, OperatingMode::Normal).await;
        tracker
            .update_status(&id, DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap();
        tracker
            .update_status(&id, DecisionStatus::Approved, OperatingMode::Normal)
            .await
            .unwrap();

        assert_eq!(tracker.get(&id).await.unwrap().status, DecisionStatus::Approved);
        // Decision record + two transition records
        assert_eq!(store.count().await, 3);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let store = ToggleStore::new();
        let tracker = tracker(store);
        let d = decision();
        let id = d.id.clone();
        tracker.track(d, OperatingMode::Normal).await;

        let err = tracker
            .update_status(&id, DecisionStatus::Executing, OperatingMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::TransitionViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_decision_not_found() {
        let tracker = tracker(ToggleStore::new());
        let err = tracker
            .update_status("dec-missing", DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_replayed_transition_is_idempotent() {
        let store = ToggleStore::new();
        let tracker = tracker(Arc::clone(&store));
        let d = decision();
        let id = d.id.clone();
        tracker.track(d, OperatingMode::Normal).await;

        tracker
            .update_status(&id, DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap();
        let before = store.count().await;
        // Same (id, status) again: no state change, no new record
        tracker
            .update_status(&id, DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap();
        assert_eq!(store.count().await, before);
        assert_eq!(
            tracker.get(&id).await.unwrap().status,
            DecisionStatus::Validating
        );
    }

    #[tokio::test]
    async fn test_offline_queue_and_flush() {
        let store = ToggleStore::new();
        let tracker = tracker(Arc::clone(&store));
        let d = decision();
        let id = d.id.clone();

        store.set_reachable(false);
        tracker.track(d, OperatingMode::Normal).await;
        tracker
            .update_status(&id, DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap();
        assert_eq!(store.count().await, 0);
        assert_eq!(tracker.pending_count().await, 2);

        // Still down: flush fails, queue intact
        assert!(tracker.flush_pending().await.is_err());
        assert_eq!(tracker.pending_count().await, 2);

        store.set_reachable(true);
        assert_eq!(tracker.flush_pending().await.unwrap(), 2);
        assert_eq!(tracker.pending_count().await, 0);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn test_constrained_mode_defers_writes() {
        let store = ToggleStore::new();
        let tracker = tracker(Arc::clone(&store));
        tracker.track(decision(), OperatingMode::Constrained).await;

        assert_eq!(store.count().await, 0);
        assert_eq!(tracker.pending_count().await, 1);
        tracker.flush_pending().await.unwrap();
        assert_eq!(store.count().await, 1);
    }

    /// Store whose writes can be made to hang until released.
    struct StallStore {
        stall: AtomicBool,
        entered: AtomicBool,
        gate: Notify,
    }

    impl StallStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                stall: AtomicBool::new(false),
                entered: AtomicBool::new(false),
                gate: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl DurableStore for StallStore {
        async fn persist(&self, _record: StoreRecord) -> Result<(), StoreError> {
            if self.stall.load(Ordering::SeqCst) {
                self.entered.store(true, Ordering::SeqCst);
                self.gate.notified().await;
            }
            Ok(())
        }

        async fn query(&self, _filter: StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_slow_store_write_does_not_block_reads() {
        let store = StallStore::new();
        let tracker = Arc::new(DecisionTracker::new(
            Arc::clone(&store) as Arc<dyn DurableStore>,
            Arc::new(EventBus::default()),
        ));

        let first = decision();
        let first_id = first.id.clone();
        tracker.track(first, OperatingMode::Normal).await;

        // A second track now hangs inside the store write
        store.stall.store(true, Ordering::SeqCst);
        let writer = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                tracker.track(decision(), OperatingMode::Normal).await;
            })
        };
        while !store.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Reads of unrelated decisions still go through
        let fetched = tokio::time::timeout(Duration::from_millis(200), tracker.get(&first_id))
            .await
            .expect("read blocked behind a store write");
        assert!(fetched.is_some());
        let metrics = tokio::time::timeout(Duration::from_millis(200), tracker.metrics())
            .await
            .expect("metrics blocked behind a store write");
        assert_eq!(metrics.total, 2);

        store.stall.store(false, Ordering::SeqCst);
        store.gate.notify_one();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_metrics_on_demand() {
        let store = ToggleStore::new();
        let tracker = tracker(store);

        let first = decision();
        let first_id = first.id.clone();
        tracker.track(first, OperatingMode::Normal).await;
        tracker.track(decision(), OperatingMode::Normal).await;
        tracker
            .update_status(&first_id, DecisionStatus::Validating, OperatingMode::Normal)
            .await
            .unwrap();

        let metrics = tracker.metrics().await;
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.by_status.get("validating"), Some(&1));
        assert_eq!(metrics.by_status.get("pending"), Some(&1));
        assert_eq!(metrics.by_category.get("pricing"), Some(&2));
        assert!((metrics.avg_confidence - 0.8).abs() < 1e-9);
    }
}
