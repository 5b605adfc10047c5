//! Agent fitness scoring
//!
//! Pure scoring used by the registry's `select_best`. Combines current load,
//! rolling success rate, and context affinity into a single comparable score.

use super::entities::{AgentDescriptor, AgentStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Weights for the fitness blend (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub load: f64,
    pub success_rate: f64,
    pub affinity: f64,
    /// Multiplier applied to Degraded agents so they never outrank a
    /// comparable Active agent
    pub degraded_penalty: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            load: 0.35,
            success_rate: 0.45,
            affinity: 0.20,
            degraded_penalty: 0.5,
        }
    }
}

/// Compute the fitness score for one candidate.
///
/// - `load` is the agent's active-lease count normalized by `max_load`
///   (higher load scores lower).
/// - `success_rate` is the exponentially-decayed fraction of successful
///   outcomes in [0, 1].
/// - Affinity is the overlap between the task's context tags and the agent's
///   affinity tags.
///
/// Offline agents score 0.0 regardless of weights.
pub fn fitness_score(
    descriptor: &AgentDescriptor,
    load: usize,
    max_load: usize,
    success_rate: f64,
    context_tags: &HashSet<String>,
    weights: &FitnessWeights,
) -> f64 {
    if descriptor.status == AgentStatus::Offline {
        return 0.0;
    }

    let load_score = 1.0 - (load as f64 / max_load.max(1) as f64).min(1.0);
    let affinity_score = if context_tags.is_empty() || descriptor.affinity_tags.is_empty() {
        0.0
    } else {
        let overlap = context_tags
            .intersection(&descriptor.affinity_tags)
            .count() as f64;
        overlap / context_tags.len() as f64
    };

    let base = weights.load * load_score
        + weights.success_rate * success_rate.clamp(0.0, 1.0)
        + weights.affinity * affinity_score;

    match descriptor.status {
        AgentStatus::Degraded => base * weights.degraded_penalty,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Capability;

    fn descriptor(id: &str) -> AgentDescriptor {
        AgentDescriptor::new(id, [Capability::Pricing])
    }

    fn tags(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_idle_agent_beats_loaded_agent() {
        let weights = FitnessWeights::default();
        let descriptor = descriptor("a");
        let idle = fitness_score(&descriptor, 0, 10, 0.8, &HashSet::new(), &weights);
        let loaded = fitness_score(&descriptor, 9, 10, 0.8, &HashSet::new(), &weights);
        assert!(idle > loaded);
    }

    #[test]
    fn test_affinity_overlap_raises_score() {
        let weights = FitnessWeights::default();
        let plain = descriptor("a");
        let tagged = descriptor("b").with_affinity_tags(tags(&["electronics", "eu"]));
        let context = tags(&["electronics"]);

        let without = fitness_score(&plain, 0, 10, 0.5, &context, &weights);
        let with = fitness_score(&tagged, 0, 10, 0.5, &context, &weights);
        assert!(with > without);
    }

    #[test]
    fn test_offline_scores_zero() {
        let weights = FitnessWeights::default();
        let mut d = descriptor("a");
        d.status = AgentStatus::Offline;
        assert_eq!(fitness_score(&d, 0, 10, 1.0, &HashSet::new(), &weights), 0.0);
    }

    #[test]
    fn test_degraded_penalized_against_comparable_active() {
        let weights = FitnessWeights::default();
        let active = descriptor("a");
        let mut degraded = descriptor("b");
        degraded.status = AgentStatus::Degraded;

        let a = fitness_score(&active, 2, 10, 0.7, &HashSet::new(), &weights);
        let d = fitness_score(&degraded, 2, 10, 0.7, &HashSet::new(), &weights);
        assert!(a > d);
    }
}
