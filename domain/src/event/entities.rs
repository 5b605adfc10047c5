//! Event entity and value objects

use crate::util::{current_timestamp, new_id};
use serde::{Deserialize, Serialize};

/// Delivery priority for an event (Value Object)
///
/// Ordered: `Low < Normal < High < Critical`. A full subscriber queue drops
/// lower-priority events before higher ones, so agent-failure and budget
/// events always survive backpressure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl EventPriority {
    pub fn as_str(&self) -> &str {
        match self {
            EventPriority::Low => "low",
            EventPriority::Normal => "normal",
            EventPriority::High => "high",
            EventPriority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for EventPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of event flowing over the bus (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A workflow changed state (Initiated, Delegating, ...)
    WorkflowStatus,
    /// A decision changed lifecycle state
    DecisionStatus,
    /// An agent was registered, degraded, or went offline
    AgentHealth,
    /// An agent failed while executing a delegated task
    AgentFailure,
    /// A routing decision completed (including escalations)
    RoutingCompleted,
    /// The inference budget rejected a request
    BudgetRejected,
    /// Outcome feedback was ingested
    FeedbackReceived,
    /// Free-form event kind for external subscribers
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::WorkflowStatus => "workflow_status",
            EventKind::DecisionStatus => "decision_status",
            EventKind::AgentHealth => "agent_health",
            EventKind::AgentFailure => "agent_failure",
            EventKind::RoutingCompleted => "routing_completed",
            EventKind::BudgetRejected => "budget_rejected",
            EventKind::FeedbackReceived => "feedback_received",
            EventKind::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event published on the bus (Entity)
///
/// Immutable once published. `target_ids` empty means broadcast; otherwise
/// delivery is restricted to subscribers with a matching id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    /// Identifier of the publishing component or agent
    pub source_id: String,
    /// Intended recipients; empty for broadcast
    #[serde(default)]
    pub target_ids: Vec<String>,
    pub payload: serde_json::Value,
    /// Milliseconds since epoch at creation time
    pub timestamp: u64,
    #[serde(default)]
    pub priority: EventPriority,
}

impl Event {
    /// Create a broadcast event with normal priority
    pub fn new(kind: EventKind, source_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: new_id("evt"),
            kind,
            source_id: source_id.into(),
            target_ids: Vec::new(),
            payload,
            timestamp: current_timestamp(),
            priority: EventPriority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.target_ids = targets;
        self
    }

    /// Whether this event should be delivered to the given subscriber id
    pub fn targets(&self, subscriber_id: &str) -> bool {
        self.target_ids.is_empty() || self.target_ids.iter().any(|t| t == subscriber_id)
    }
}
