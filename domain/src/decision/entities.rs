//! Decision entities and lifecycle state machine

use crate::core::error::CoordinationError;
use crate::util::{current_timestamp, new_id};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A candidate action under consideration (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: String,
    /// Free-form attributes consulted by constraints and connectors
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub estimated_cost: f64,
    pub estimated_value: f64,
}

impl DecisionOption {
    pub fn new(id: impl Into<String>, estimated_value: f64, estimated_cost: f64) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
            estimated_cost,
            estimated_value,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Hard constraints filtering the feasible option set (Value Object)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min_value: Option<f64>,
    pub max_cost: Option<f64>,
    /// Attribute keys an option must carry to be feasible
    pub required_attributes: Vec<String>,
}

impl Constraints {
    pub fn with_min_value(mut self, min_value: f64) -> Self {
        self.min_value = Some(min_value);
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    /// Whether the option satisfies every hard constraint
    pub fn permits(&self, option: &DecisionOption) -> bool {
        if let Some(min) = self.min_value
            && option.estimated_value < min
        {
            return false;
        }
        if let Some(max) = self.max_cost
            && option.estimated_cost > max
        {
            return false;
        }
        self.required_attributes
            .iter()
            .all(|key| option.attributes.contains_key(key))
    }
}

/// Context a decision is made in (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Category key for learning and feedback aggregation
    pub category: String,
    /// Short human-readable summary of what is being decided
    pub summary: String,
    /// Tags matched against agent affinity during selection
    #[serde(default)]
    pub tags: HashSet<String>,
}

impl DecisionContext {
    pub fn new(category: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            summary: summary.into(),
            tags: HashSet::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

/// Lifecycle state of a decision (Value Object)
///
/// ```text
/// Pending -> Validating -> Approved -> Executing -> Completed
///                       \> Rejected             \> Failed
/// ```
///
/// Canceled and Expired are reachable from every non-terminal state.
/// Transitions are monotonic: there are no back-edges. A retry is a new
/// decision created by the orchestrator, never a rewound one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    Validating,
    Approved,
    Rejected,
    Executing,
    Completed,
    Failed,
    Canceled,
    Expired,
}

impl DecisionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DecisionStatus::Rejected
                | DecisionStatus::Completed
                | DecisionStatus::Failed
                | DecisionStatus::Canceled
                | DecisionStatus::Expired
        )
    }

    /// Legal transition check. Re-applying the current status is handled
    /// upstream (idempotent no-op in the tracker), not here.
    pub fn can_transition_to(&self, next: DecisionStatus) -> bool {
        use DecisionStatus::*;
        match (self, next) {
            (Pending, Validating) => true,
            (Validating, Approved) | (Validating, Rejected) => true,
            (Approved, Executing) => true,
            (Executing, Completed) | (Executing, Failed) => true,
            // Cancellation / expiry from any non-terminal state
            (from, Canceled) | (from, Expired) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::Validating => "validating",
            DecisionStatus::Approved => "approved",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Executing => "executing",
            DecisionStatus::Completed => "completed",
            DecisionStatus::Failed => "failed",
            DecisionStatus::Canceled => "canceled",
            DecisionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked, validated choice among options (Entity)
///
/// Owned by the Decision Tracker once created; all status changes go through
/// `apply_status` so the transition graph is enforced in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub category: String,
    pub context: DecisionContext,
    /// Absent when no feasible option existed
    pub chosen_option: Option<DecisionOption>,
    /// Always in [0, 1]
    pub confidence: f64,
    pub rationale: String,
    pub status: DecisionStatus,
    /// Set when scoring ran under a constrained-resource context
    #[serde(default)]
    pub resource_efficient: bool,
    /// Milliseconds since epoch
    pub created_at: u64,
}

impl Decision {
    pub fn new(
        context: DecisionContext,
        chosen_option: DecisionOption,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id("dec"),
            category: context.category.clone(),
            context,
            chosen_option: Some(chosen_option),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            status: DecisionStatus::Pending,
            resource_efficient: false,
            created_at: current_timestamp(),
        }
    }

    /// A decision born rejected (no feasible option existed).
    pub fn rejected(context: DecisionContext, rationale: impl Into<String>) -> Self {
        Self {
            id: new_id("dec"),
            category: context.category.clone(),
            context,
            chosen_option: None,
            confidence: 0.0,
            rationale: rationale.into(),
            status: DecisionStatus::Rejected,
            resource_efficient: false,
            created_at: current_timestamp(),
        }
    }

    pub fn with_resource_efficient(mut self, flag: bool) -> Self {
        self.resource_efficient = flag;
        self
    }

    /// Apply a lifecycle transition, enforcing the state graph.
    ///
    /// Re-applying the current status is an idempotent no-op (returns
    /// `Ok(false)`); a legal move returns `Ok(true)`.
    pub fn apply_status(&mut self, next: DecisionStatus) -> Result<bool, CoordinationError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(CoordinationError::TransitionViolation {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(true)
    }
}
