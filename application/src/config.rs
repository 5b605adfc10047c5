//! Aggregated coordination configuration
//!
//! One struct carrying every tunable of the application layer, so wiring
//! code configures the whole core from a single place. File loading and
//! layering live in the infrastructure layer; this is the already-resolved
//! form.

use crate::bus::BusConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::registry::RegistryConfig;
use crate::routing::router::RouterConfig;
use agora_domain::{
    CategoryAllowList, CostCeiling, DecisionValidator, LearningParams, ScoringWeights,
};

/// Validation gate tunables
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub min_confidence: f64,
    pub min_rationale_chars: usize,
    /// When set, decisions outside these categories are rejected
    pub allowed_categories: Option<Vec<String>>,
    /// When set, caps the chosen option's estimated cost
    pub cost_ceiling: Option<f64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            min_rationale_chars: 10,
            allowed_categories: None,
            cost_ceiling: None,
        }
    }
}

impl ValidationConfig {
    /// Materialize the configured rule set.
    pub fn build_validator(&self) -> DecisionValidator {
        let mut validator =
            DecisionValidator::standard(self.min_confidence, self.min_rationale_chars);
        if let Some(categories) = &self.allowed_categories {
            validator.push(Box::new(CategoryAllowList {
                allowed: categories.iter().cloned().collect(),
            }));
        }
        if let Some(max_cost) = self.cost_ceiling {
            validator.push(Box::new(CostCeiling { max_cost }));
        }
        validator
    }
}

/// Inference budget tunables
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    pub daily_limit: f64,
    pub per_request_max: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_limit: 5.0,
            per_request_max: 0.25,
        }
    }
}

/// Every tunable of the coordination core, resolved and ready to wire
#[derive(Debug, Clone, Default)]
pub struct CoordinationConfig {
    pub scoring: ScoringWeights,
    pub validation: ValidationConfig,
    pub learning: LearningParams,
    pub budget: BudgetConfig,
    pub router: RouterConfig,
    pub registry: RegistryConfig,
    pub bus: BusConfig,
    pub orchestrator: OrchestratorConfig,
}
