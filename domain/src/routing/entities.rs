//! Routing decision record

use super::tier::ModelTier;
use serde::{Deserialize, Serialize};

/// Per-request routing state (Value Object)
///
/// Monotonic progression:
/// `Received -> TierSelected -> (Escalated) -> Completed | Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStage {
    Received,
    TierSelected,
    Escalated,
    Completed,
    Rejected,
}

impl RoutingStage {
    pub fn as_str(&self) -> &str {
        match self {
            RoutingStage::Received => "received",
            RoutingStage::TierSelected => "tier_selected",
            RoutingStage::Escalated => "escalated",
            RoutingStage::Completed => "completed",
            RoutingStage::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RoutingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of how one inference request was routed (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: String,
    pub chosen_tier: ModelTier,
    /// Total cost charged to the budget (both attempts when escalated)
    pub estimated_cost: f64,
    /// Quality signal observed from the final attempt
    pub observed_quality: Option<f64>,
    pub escalated: bool,
    pub stage: RoutingStage,
}

impl RoutingDecision {
    pub fn received(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            chosen_tier: ModelTier::Lite,
            estimated_cost: 0.0,
            observed_quality: None,
            escalated: false,
            stage: RoutingStage::Received,
        }
    }

    pub fn select_tier(&mut self, tier: ModelTier, cost: f64) {
        self.chosen_tier = tier;
        self.estimated_cost = cost;
        self.stage = RoutingStage::TierSelected;
    }

    /// Record an escalation to the next tier; the extra cost is additive
    /// (both attempts are charged).
    pub fn escalate(&mut self, tier: ModelTier, extra_cost: f64) {
        self.chosen_tier = tier;
        self.estimated_cost += extra_cost;
        self.escalated = true;
        self.stage = RoutingStage::Escalated;
    }

    pub fn complete(&mut self, observed_quality: f64) {
        self.observed_quality = Some(observed_quality.clamp(0.0, 1.0));
        self.stage = RoutingStage::Completed;
    }

    pub fn reject(&mut self) {
        self.stage = RoutingStage::Rejected;
    }
}
