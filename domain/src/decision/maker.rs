//! Decision Maker
//!
//! Scores options against constraints and learned weights, producing a
//! ranked decision with confidence and rationale. Pure logic: the pipeline
//! (application layer) supplies the learning snapshot and operating mode.

use super::entities::{Constraints, Decision, DecisionContext, DecisionOption};
use crate::core::mode::OperatingMode;
use crate::learning::LearningState;
use serde::{Deserialize, Serialize};

const SCORE_EPSILON: f64 = 1e-9;

/// Weights for the option-scoring blend (Value Object)
///
/// The exact numbers are tunable configuration; the algorithm shape
/// (normalized value + inverse cost + learning adjustment, margin-based
/// confidence) is the contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub value: f64,
    pub cost: f64,
    pub learning: f64,
    /// Multiplier applied to the cost weight under constrained mode
    pub constrained_cost_boost: f64,
    /// Confidence assigned when exactly one feasible option exists
    /// (no comparative signal is available)
    pub single_option_ceiling: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            value: 0.45,
            cost: 0.35,
            learning: 0.20,
            constrained_cost_boost: 2.0,
            single_option_ceiling: 0.75,
        }
    }
}

/// Scores options and produces decisions
#[derive(Debug, Clone, Default)]
pub struct DecisionMaker {
    weights: ScoringWeights,
}

impl DecisionMaker {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Propose a decision for the given context.
    ///
    /// Filters options violating hard constraints, scores the survivors via
    /// a weighted sum of normalized value, inverse cost, and the category's
    /// learning adjustment, then picks the top score. Confidence is the
    /// normalized margin between rank 1 and rank 2.
    ///
    /// Edge cases:
    /// - empty feasible set: decision is born `Rejected` with rationale
    ///   "no feasible option";
    /// - exactly one feasible option: confidence is the single-option
    ///   ceiling.
    pub fn propose(
        &self,
        context: DecisionContext,
        options: &[DecisionOption],
        constraints: &Constraints,
        learning: &LearningState,
        mode: OperatingMode,
    ) -> Decision {
        let feasible: Vec<&DecisionOption> =
            options.iter().filter(|o| constraints.permits(o)).collect();

        if feasible.is_empty() {
            return Decision::rejected(context, "no feasible option")
                .with_resource_efficient(mode.is_constrained());
        }

        let cost_weight = if mode.is_constrained() {
            self.weights.cost * self.weights.constrained_cost_boost
        } else {
            self.weights.cost
        };

        let max_value = feasible
            .iter()
            .map(|o| o.estimated_value)
            .fold(SCORE_EPSILON, f64::max);
        let max_inverse_cost = feasible
            .iter()
            .map(|o| inverse_cost(o.estimated_cost))
            .fold(SCORE_EPSILON, f64::max);
        let adjustment = learning.adjustment_for(&context.category);

        let mut scored: Vec<(f64, &DecisionOption)> = feasible
            .iter()
            .map(|o| {
                let score = self.weights.value * (o.estimated_value / max_value)
                    + cost_weight * (inverse_cost(o.estimated_cost) / max_inverse_cost)
                    + self.weights.learning * adjustment;
                (score, *o)
            })
            .collect();
        // Stable sort keeps input order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let (top_score, chosen) = scored[0];
        let confidence = if scored.len() == 1 {
            self.weights.single_option_ceiling
        } else {
            let margin = (top_score - scored[1].0) / top_score.abs().max(SCORE_EPSILON);
            margin.clamp(0.0, 1.0)
        };

        let rationale = build_rationale(chosen, &context, scored.len(), top_score, adjustment, mode);

        Decision::new(context, chosen.clone(), confidence, rationale)
            .with_resource_efficient(mode.is_constrained())
    }
}

fn inverse_cost(cost: f64) -> f64 {
    1.0 / (cost.max(0.0) + 0.01)
}

fn build_rationale(
    chosen: &DecisionOption,
    context: &DecisionContext,
    feasible_count: usize,
    score: f64,
    adjustment: f64,
    mode: OperatingMode,
) -> String {
    let mut rationale = format!(
        "Selected option '{}' for '{}' with top score {:.3} among {} feasible option(s): \
         value {:.2} at estimated cost {:.4}",
        chosen.id, context.summary, score, feasible_count, chosen.estimated_value, chosen.estimated_cost
    );
    if adjustment.abs() > SCORE_EPSILON {
        rationale.push_str(&format!(
            "; learned adjustment for category '{}' is {:+.3}",
            context.category, adjustment
        ));
    }
    if mode.is_constrained() {
        rationale.push_str("; constrained-resource mode favored lower cost");
    }
    rationale
}
