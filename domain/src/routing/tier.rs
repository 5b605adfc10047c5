//! Inference tiers and task classification

use crate::util::new_id;
use serde::{Deserialize, Serialize};

/// A cost/quality class of inference backend (Value Object)
///
/// Ordered from cheapest to most capable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Lite,
    Standard,
    Premium,
}

impl ModelTier {
    /// Nominal cost charged to the budget per call
    pub fn cost_per_call(&self) -> f64 {
        match self {
            ModelTier::Lite => 0.002,
            ModelTier::Standard => 0.012,
            ModelTier::Premium => 0.060,
        }
    }

    /// Quality this tier typically delivers, in [0, 1]
    pub fn typical_quality(&self) -> f64 {
        match self {
            ModelTier::Lite => 0.55,
            ModelTier::Standard => 0.75,
            ModelTier::Premium => 0.92,
        }
    }

    /// The next tier up, if any
    pub fn next_up(&self) -> Option<ModelTier> {
        match self {
            ModelTier::Lite => Some(ModelTier::Standard),
            ModelTier::Standard => Some(ModelTier::Premium),
            ModelTier::Premium => None,
        }
    }

    /// All tiers, cheapest first
    pub fn all() -> &'static [ModelTier] {
        &[ModelTier::Lite, ModelTier::Standard, ModelTier::Premium]
    }

    /// Cheapest tier whose typical quality meets the requirement
    pub fn cheapest_meeting(min_quality: f64) -> Option<ModelTier> {
        ModelTier::all()
            .iter()
            .find(|t| t.typical_quality() >= min_quality)
            .copied()
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelTier::Lite => "lite",
            ModelTier::Standard => "standard",
            ModelTier::Premium => "premium",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse complexity class of an inference task (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Low,
    Medium,
    High,
}

impl TaskComplexity {
    /// Quality a task of this complexity minimally needs
    pub fn required_quality(&self) -> f64 {
        match self {
            TaskComplexity::Low => 0.5,
            TaskComplexity::Medium => 0.7,
            TaskComplexity::High => 0.85,
        }
    }

    /// Heuristic classification from the task description: keyword cues
    /// first, then length.
    pub fn classify(description: &str) -> TaskComplexity {
        let lowered = description.to_lowercase();
        const HIGH_CUES: &[&str] = &["negotiate", "synthesize", "strategy", "plan", "analyze"];
        const LOW_CUES: &[&str] = &["format", "summarize", "extract", "lookup"];

        if HIGH_CUES.iter().any(|cue| lowered.contains(cue)) {
            return TaskComplexity::High;
        }
        if LOW_CUES.iter().any(|cue| lowered.contains(cue)) {
            return TaskComplexity::Low;
        }
        if description.len() > 400 {
            TaskComplexity::High
        } else if description.len() > 120 {
            TaskComplexity::Medium
        } else {
            TaskComplexity::Low
        }
    }
}

/// Describes one inference request to be routed (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub description: String,
    /// Explicit complexity; classified from the description when absent
    #[serde(default)]
    pub complexity: Option<TaskComplexity>,
    /// Explicit quality floor; derived from complexity when absent
    #[serde(default)]
    pub min_quality: Option<f64>,
    /// Optional per-task spend cap
    #[serde(default)]
    pub max_cost: Option<f64>,
}

impl TaskDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: new_id("task"),
            description: description.into(),
            complexity: None,
            min_quality: None,
            max_cost: None,
        }
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = Some(min_quality.clamp(0.0, 1.0));
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn resolved_complexity(&self) -> TaskComplexity {
        self.complexity
            .unwrap_or_else(|| TaskComplexity::classify(&self.description))
    }

    /// Effective quality floor for tier selection
    pub fn required_quality(&self) -> f64 {
        self.min_quality
            .unwrap_or_else(|| self.resolved_complexity().required_quality())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_ordered_by_cost_and_quality() {
        let tiers = ModelTier::all();
        for pair in tiers.windows(2) {
            assert!(pair[0].cost_per_call() < pair[1].cost_per_call());
            assert!(pair[0].typical_quality() < pair[1].typical_quality());
        }
    }

    #[test]
    fn test_cheapest_meeting_picks_lowest_sufficient_tier() {
        assert_eq!(ModelTier::cheapest_meeting(0.5), Some(ModelTier::Lite));
        assert_eq!(ModelTier::cheapest_meeting(0.7), Some(ModelTier::Standard));
        assert_eq!(ModelTier::cheapest_meeting(0.9), Some(ModelTier::Premium));
        assert_eq!(ModelTier::cheapest_meeting(0.99), None);
    }

    #[test]
    fn test_premium_has_no_next_tier() {
        assert_eq!(ModelTier::Lite.next_up(), Some(ModelTier::Standard));
        assert_eq!(ModelTier::Premium.next_up(), None);
    }

    #[test]
    fn test_keyword_cues_outrank_length() {
        assert_eq!(
            TaskComplexity::classify("negotiate bulk discount"),
            TaskComplexity::High
        );
        assert_eq!(
            TaskComplexity::classify("format the listing title"),
            TaskComplexity::Low
        );
    }

    #[test]
    fn test_length_based_classification() {
        assert_eq!(TaskComplexity::classify("short"), TaskComplexity::Low);
        let medium = "describe the product condition in enough detail for a buyer \
                      to judge wear, included accessories, original packaging, and \
                      any cosmetic flaws";
        assert_eq!(TaskComplexity::classify(medium), TaskComplexity::Medium);
    }

    #[test]
    fn test_explicit_min_quality_wins() {
        let task = TaskDescriptor::new("format this").with_min_quality(0.9);
        assert_eq!(task.required_quality(), 0.9);
    }

    #[test]
    fn test_derived_quality_from_complexity() {
        let task = TaskDescriptor::new("plan the quarter's sourcing strategy");
        assert_eq!(task.required_quality(), TaskComplexity::High.required_quality());
    }
}
