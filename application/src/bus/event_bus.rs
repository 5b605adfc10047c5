//! Best-effort typed publish/subscribe transport
//!
//! Delivery is at-most-once: a subscriber that is offline (or registered
//! late) simply misses events published meanwhile. Decision state itself is
//! durably tracked elsewhere; the bus favors low-latency coordination over
//! durability.
//!
//! Transport contract, tested here:
//! - per-`source_id` order is preserved to any one subscriber (no global
//!   cross-source order);
//! - each subscriber has a bounded queue; when full, the lowest-priority
//!   queued event is dropped first, and an incoming event that does not
//!   outrank the queue's lowest is dropped itself. Critical events (agent
//!   failure, budget exhaustion) therefore survive backpressure.

use agora_domain::{Event, EventKind};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Bus tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Per-subscriber queue capacity
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

/// Which event kinds a subscriber wants
#[derive(Debug, Clone)]
pub enum TypePattern {
    All,
    Kinds(HashSet<EventKind>),
}

impl TypePattern {
    pub fn all() -> Self {
        TypePattern::All
    }

    pub fn of(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        TypePattern::Kinds(kinds.into_iter().collect())
    }

    pub fn matches(&self, kind: &EventKind) -> bool {
        match self {
            TypePattern::All => true,
            TypePattern::Kinds(kinds) => kinds.contains(kind),
        }
    }
}

struct QueueState {
    deque: VecDeque<Event>,
    closed: bool,
    dropped: u64,
}

struct SubscriberQueue {
    subscriber_id: String,
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl SubscriberQueue {
    fn new(subscriber_id: String, capacity: usize) -> Self {
        Self {
            subscriber_id,
            capacity,
            state: Mutex::new(QueueState {
                deque: VecDeque::new(),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue respecting the priority-drop policy. Returns false when the
    /// event was dropped.
    fn push(&self, event: Event) -> bool {
        let accepted = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.closed {
                return false;
            }
            if state.deque.len() >= self.capacity {
                // Oldest lowest-priority event is the eviction candidate
                let lowest = state
                    .deque
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.priority)
                    .map(|(idx, e)| (idx, e.priority));
                match lowest {
                    Some((idx, priority)) if priority < event.priority => {
                        state.deque.remove(idx);
                        state.dropped += 1;
                        state.deque.push_back(event);
                        true
                    }
                    _ => {
                        state.dropped += 1;
                        false
                    }
                }
            } else {
                state.deque.push_back(event);
                true
            }
        };
        if accepted {
            self.notify.notify_one();
        } else {
            warn!(
                subscriber = %self.subscriber_id,
                "Subscriber queue full, event dropped"
            );
        }
        accepted
    }

    fn pop(&self) -> Option<Event> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.deque.pop_front()
    }

    fn is_closed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .closed
    }

    fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .closed = true;
        self.notify.notify_waiters();
    }

    fn dropped(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .dropped
    }
}

struct SubscriberEntry {
    pattern: TypePattern,
    queue: Arc<SubscriberQueue>,
}

/// Typed publish/subscribe transport between components
pub struct EventBus {
    config: BusConfig,
    subscribers: Mutex<Vec<SubscriberEntry>>,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber for events matching `pattern`.
    ///
    /// Only events published after this call are delivered (at-most-once
    /// semantics); targeted events additionally require `subscriber_id` to
    /// appear in the event's target list.
    pub fn subscribe(&self, subscriber_id: impl Into<String>, pattern: TypePattern) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new(
            subscriber_id.into(),
            self.config.queue_capacity,
        ));
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push(SubscriberEntry {
            pattern,
            queue: Arc::clone(&queue),
        });
        Subscription { queue }
    }

    /// Fan an event out to every matching live subscriber.
    ///
    /// Returns how many subscriber queues accepted it. Publishing holds the
    /// subscriber list lock for the whole fan-out, which is what serializes
    /// same-source publishes into a consistent per-subscriber order.
    pub fn publish(&self, event: Event) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|entry| !entry.queue.is_closed());

        let mut accepted = 0;
        for entry in subscribers.iter() {
            if entry.pattern.matches(&event.kind) && event.targets(&entry.queue.subscriber_id) {
                if entry.queue.push(event.clone()) {
                    accepted += 1;
                }
            }
        }
        debug!(kind = %event.kind, source = %event.source_id, accepted, "Event published");
        accepted
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|entry| !entry.queue.is_closed());
        subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

/// A subscriber's receiving end. Dropping it unsubscribes.
pub struct Subscription {
    queue: Arc<SubscriberQueue>,
}

impl Subscription {
    /// Await the next event.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            // Arm the notification before checking the queue so a push
            // between the check and the await cannot be missed.
            let notified = self.queue.notify.notified();
            if let Some(event) = self.queue.pop() {
                return Some(event);
            }
            if self.queue.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Non-blocking poll.
    pub fn try_recv(&self) -> Option<Event> {
        self.queue.pop()
    }

    /// Events this subscriber lost to backpressure.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_domain::EventPriority;
    use serde_json::json;

    fn event(kind: EventKind, source: &str, seq: u64) -> Event {
        Event::new(kind, source, json!({ "seq": seq }))
    }

    #[tokio::test]
    async fn test_per_source_order_preserved() {
        let bus = EventBus::default();
        let subscription = bus.subscribe("monitor", TypePattern::all());

        for seq in 0..10u64 {
            bus.publish(event(EventKind::WorkflowStatus, "orchestrator", seq));
        }
        for expected in 0..10u64 {
            let received = subscription.recv().await.unwrap();
            assert_eq!(received.payload["seq"], expected);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.publish(event(EventKind::WorkflowStatus, "orchestrator", 1));

        let subscription = bus.subscribe("late", TypePattern::all());
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lowest_priority_dropped_first_under_backpressure() {
        let bus = EventBus::new(BusConfig { queue_capacity: 2 });
        let subscription = bus.subscribe("monitor", TypePattern::all());

        bus.publish(
            event(EventKind::WorkflowStatus, "a", 1).with_priority(EventPriority::Low),
        );
        bus.publish(
            event(EventKind::WorkflowStatus, "a", 2).with_priority(EventPriority::Normal),
        );
        // Queue is full; the critical failure event must evict the Low one
        bus.publish(
            event(EventKind::AgentFailure, "registry", 3).with_priority(EventPriority::Critical),
        );

        let first = subscription.recv().await.unwrap();
        let second = subscription.recv().await.unwrap();
        assert_eq!(first.payload["seq"], 2);
        assert_eq!(second.payload["seq"], 3);
        assert_eq!(subscription.dropped(), 1);
    }

    #[tokio::test]
    async fn test_incoming_low_priority_dropped_when_full_of_higher() {
        let bus = EventBus::new(BusConfig { queue_capacity: 2 });
        let subscription = bus.subscribe("monitor", TypePattern::all());

        bus.publish(event(EventKind::AgentFailure, "a", 1).with_priority(EventPriority::High));
        bus.publish(event(EventKind::AgentFailure, "a", 2).with_priority(EventPriority::High));
        let accepted = bus.publish(
            event(EventKind::WorkflowStatus, "a", 3).with_priority(EventPriority::Low),
        );

        assert_eq!(accepted, 0);
        assert_eq!(subscription.recv().await.unwrap().payload["seq"], 1);
        assert_eq!(subscription.recv().await.unwrap().payload["seq"], 2);
    }

    #[tokio::test]
    async fn test_pattern_filters_kinds() {
        let bus = EventBus::default();
        let subscription =
            bus.subscribe("budget-watch", TypePattern::of([EventKind::BudgetRejected]));

        bus.publish(event(EventKind::WorkflowStatus, "orchestrator", 1));
        bus.publish(event(EventKind::BudgetRejected, "router", 2));

        let received = subscription.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::BudgetRejected);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_targeted_delivery() {
        let bus = EventBus::default();
        let for_me = bus.subscribe("agent-1", TypePattern::all());
        let not_me = bus.subscribe("agent-2", TypePattern::all());

        bus.publish(
            event(EventKind::DecisionStatus, "tracker", 1)
                .with_targets(vec!["agent-1".to_string()]),
        );

        assert!(for_me.try_recv().is_some());
        assert!(not_me.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_pruned() {
        let bus = EventBus::default();
        let subscription = bus.subscribe("gone", TypePattern::all());
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
        // Publishing into the void is fine
        assert_eq!(bus.publish(event(EventKind::WorkflowStatus, "a", 1)), 0);
    }
}
