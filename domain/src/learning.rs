//! Learning state and update rules
//!
//! Per-category confidence weights adapted from outcome feedback. The state
//! is pure data with pure update methods; single-writer ownership is enforced
//! by the application layer's learning actor, which is the only mutator.

use crate::core::mode::OperatingMode;
use crate::feedback::Feedback;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Learned signal for one decision category (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLearning {
    /// Additive adjustment applied during option scoring, in [-1, 1]
    pub confidence_adjustment: f64,
    /// Smoothed quality estimate, in [0, 1]
    pub weight: f64,
    pub sample_count: u64,
    /// Exponentially-smoothed mean quality used as the learning baseline
    pub running_mean: f64,
}

impl Default for CategoryLearning {
    fn default() -> Self {
        Self {
            confidence_adjustment: 0.0,
            weight: 0.5,
            sample_count: 0,
            running_mean: 0.5,
        }
    }
}

/// Tunable learning parameters (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningParams {
    /// Step size applied to the (quality − mean) delta
    pub learning_rate: f64,
    /// Decay factor for the recency-weighted refinement pass
    pub recency_decay: f64,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            recency_decay: 0.8,
        }
    }
}

/// Category-keyed learning state (Entity)
///
/// Mutated only by the Learning Engine; the Decision Maker reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    categories: HashMap<String, CategoryLearning>,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scoring adjustment for a category; 0.0 when nothing was learned yet.
    pub fn adjustment_for(&self, category: &str) -> f64 {
        self.categories
            .get(category)
            .map(|c| c.confidence_adjustment)
            .unwrap_or(0.0)
    }

    pub fn category(&self, category: &str) -> Option<&CategoryLearning> {
        self.categories.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &CategoryLearning)> {
        self.categories.iter()
    }

    /// Ingest a feedback batch.
    ///
    /// Main pass, per item: `delta = (quality − running_mean) · rate`, added
    /// to the category's `confidence_adjustment`; `weight` and `running_mean`
    /// move toward the observed quality by exponential smoothing, and
    /// `sample_count` increments. Because the mean is smoothed (never jumping
    /// all the way to the observation), a batch entirely above the mean moves
    /// the adjustment strictly upward, and symmetrically downward.
    ///
    /// Under `OperatingMode::Normal` a second, recency-weighted pass refines
    /// the adjustment against the pre-batch baseline, favoring later items.
    /// `Constrained` mode skips that pass (single-pass update, lower compute).
    pub fn learn(&mut self, batch: &[Feedback], params: &LearningParams, mode: OperatingMode) {
        if batch.is_empty() {
            return;
        }

        // Baselines before the batch, for the refinement pass
        let mut baselines: HashMap<&str, f64> = HashMap::new();
        for item in batch {
            baselines
                .entry(item.category.as_str())
                .or_insert_with(|| self.entry(&item.category).running_mean);
        }

        for item in batch {
            let entry = self.entry(&item.category);
            let delta = (item.quality - entry.running_mean) * params.learning_rate;
            entry.confidence_adjustment = (entry.confidence_adjustment + delta).clamp(-1.0, 1.0);
            entry.weight =
                entry.weight * (1.0 - params.learning_rate) + item.quality * params.learning_rate;
            entry.running_mean = entry.running_mean
                + (item.quality - entry.running_mean) * params.learning_rate;
            entry.sample_count += 1;
        }

        if mode.is_constrained() {
            return;
        }

        // Recency-weighting pass: later items get exponentially more say,
        // measured against the pre-batch baseline so the direction of the
        // main pass is preserved.
        let mut recency = 1.0;
        for item in batch.iter().rev() {
            let baseline = baselines.get(item.category.as_str()).copied().unwrap_or(0.5);
            let refine = (item.quality - baseline) * params.learning_rate * recency * 0.5;
            let entry = self.entry(&item.category);
            entry.confidence_adjustment =
                (entry.confidence_adjustment + refine).clamp(-1.0, 1.0);
            recency *= params.recency_decay;
        }
    }

    /// Clear learned state for one category, or everything when `None`.
    pub fn reset(&mut self, category: Option<&str>) {
        match category {
            Some(key) => {
                self.categories.remove(key);
            }
            None => self.categories.clear(),
        }
    }

    fn entry(&mut self, category: &str) -> &mut CategoryLearning {
        self.categories.entry(category.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackData;

    fn feedback(category: &str, quality: f64) -> Feedback {
        Feedback::new("dec-x", category, FeedbackData::new(quality, 0.5))
    }

    #[test]
    fn test_above_mean_batch_moves_adjustment_strictly_up() {
        let mut state = LearningState::new();
        let before = state.adjustment_for("pricing");
        let batch: Vec<_> = (0..5).map(|_| feedback("pricing", 0.9)).collect();
        state.learn(&batch, &LearningParams::default(), OperatingMode::Normal);
        assert!(state.adjustment_for("pricing") > before);
    }

    #[test]
    fn test_below_mean_batch_moves_adjustment_strictly_down() {
        let mut state = LearningState::new();
        let before = state.adjustment_for("pricing");
        let batch: Vec<_> = (0..5).map(|_| feedback("pricing", 0.1)).collect();
        state.learn(&batch, &LearningParams::default(), OperatingMode::Constrained);
        assert!(state.adjustment_for("pricing") < before);
    }

    #[test]
    fn test_sample_count_increments_per_item() {
        let mut state = LearningState::new();
        let batch: Vec<_> = (0..3).map(|_| feedback("listing", 0.7)).collect();
        state.learn(&batch, &LearningParams::default(), OperatingMode::Normal);
        assert_eq!(state.category("listing").unwrap().sample_count, 3);
    }

    #[test]
    fn test_constrained_mode_single_pass_differs_from_normal() {
        let batch: Vec<_> = (0..4).map(|_| feedback("pricing", 0.95)).collect();

        let mut normal = LearningState::new();
        normal.learn(&batch, &LearningParams::default(), OperatingMode::Normal);

        let mut constrained = LearningState::new();
        constrained.learn(&batch, &LearningParams::default(), OperatingMode::Constrained);

        // The refinement pass adds extra movement in the same direction
        assert!(
            normal.adjustment_for("pricing") > constrained.adjustment_for("pricing")
        );
        assert!(constrained.adjustment_for("pricing") > 0.0);
    }

    #[test]
    fn test_reset_single_category() {
        let mut state = LearningState::new();
        state.learn(&[feedback("pricing", 0.9)], &LearningParams::default(), OperatingMode::Normal);
        state.learn(&[feedback("listing", 0.9)], &LearningParams::default(), OperatingMode::Normal);

        state.reset(Some("pricing"));
        assert_eq!(state.adjustment_for("pricing"), 0.0);
        assert!(state.adjustment_for("listing") > 0.0);

        state.reset(None);
        assert_eq!(state.adjustment_for("listing"), 0.0);
    }

    #[test]
    fn test_adjustment_stays_bounded() {
        let mut state = LearningState::new();
        let params = LearningParams {
            learning_rate: 0.9,
            recency_decay: 0.9,
        };
        for _ in 0..200 {
            state.learn(&[feedback("pricing", 1.0)], &params, OperatingMode::Normal);
        }
        let adjustment = state.adjustment_for("pricing");
        assert!((-1.0..=1.0).contains(&adjustment));
    }
}
