//! Raw TOML configuration data types
//!
//! These structs mirror the structure of the TOML config file exactly.
//! Defaults come from the domain and application types so a missing section
//! behaves the same as no config file at all.

use agora_application::config::{
    BudgetConfig, CoordinationConfig, ValidationConfig,
};
use agora_application::bus::BusConfig;
use agora_application::orchestrator::OrchestratorConfig;
use agora_application::registry::RegistryConfig;
use agora_application::routing::router::RouterConfig;
use agora_domain::{FitnessWeights, HeartbeatPolicy, LearningParams, OperatingMode, ScoringWeights};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("scoring weights must be non-negative")]
    NegativeScoringWeight,

    #[error("escalation_floor must be within [0, 1]")]
    InvalidEscalationFloor,

    #[error("budget limits must be positive")]
    NonPositiveBudget,

    #[error("bus queue_capacity cannot be 0")]
    ZeroQueueCapacity,

    #[error("registry heartbeat_interval_ms cannot be 0")]
    ZeroHeartbeatInterval,
}

/// Raw scoring weights from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileScoringConfig {
    pub value: f64,
    pub cost: f64,
    pub learning: f64,
    pub constrained_cost_boost: f64,
    pub single_option_ceiling: f64,
}

impl Default for FileScoringConfig {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            value: weights.value,
            cost: weights.cost,
            learning: weights.learning,
            constrained_cost_boost: weights.constrained_cost_boost,
            single_option_ceiling: weights.single_option_ceiling,
        }
    }
}

/// Raw validation gate settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileValidationConfig {
    pub min_confidence: f64,
    pub min_rationale_chars: usize,
    pub allowed_categories: Option<Vec<String>>,
    pub cost_ceiling: Option<f64>,
}

impl Default for FileValidationConfig {
    fn default() -> Self {
        let config = ValidationConfig::default();
        Self {
            min_confidence: config.min_confidence,
            min_rationale_chars: config.min_rationale_chars,
            allowed_categories: config.allowed_categories,
            cost_ceiling: config.cost_ceiling,
        }
    }
}

/// Raw learning parameters from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLearningConfig {
    pub learning_rate: f64,
    pub recency_decay: f64,
}

impl Default for FileLearningConfig {
    fn default() -> Self {
        let params = LearningParams::default();
        Self {
            learning_rate: params.learning_rate,
            recency_decay: params.recency_decay,
        }
    }
}

/// Raw budget settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBudgetConfig {
    pub daily_limit: f64,
    pub per_request_max: f64,
}

impl Default for FileBudgetConfig {
    fn default() -> Self {
        let config = BudgetConfig::default();
        Self {
            daily_limit: config.daily_limit,
            per_request_max: config.per_request_max,
        }
    }
}

/// Raw router settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRouterConfig {
    pub escalation_floor: f64,
    pub allow_budget_override: bool,
}

impl Default for FileRouterConfig {
    fn default() -> Self {
        let config = RouterConfig::default();
        Self {
            escalation_floor: config.escalation_floor,
            allow_budget_override: config.allow_budget_override,
        }
    }
}

/// Raw registry settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRegistryConfig {
    pub heartbeat_interval_ms: u64,
    pub degraded_after: u32,
    pub offline_after: u32,
    pub max_load: usize,
    pub success_smoothing: f64,
}

impl Default for FileRegistryConfig {
    fn default() -> Self {
        let config = RegistryConfig::default();
        Self {
            heartbeat_interval_ms: config.heartbeat.interval_ms,
            degraded_after: config.heartbeat.degraded_after,
            offline_after: config.heartbeat.offline_after,
            max_load: config.max_load,
            success_smoothing: config.success_smoothing,
        }
    }
}

/// Raw event bus settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBusConfig {
    pub queue_capacity: usize,
}

impl Default for FileBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: BusConfig::default().queue_capacity,
        }
    }
}

/// Raw orchestrator settings from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    pub select_retries: u32,
    pub select_backoff_ms: u64,
    pub workflow_timeout_ms: u64,
    pub auto_feedback: bool,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let config = OrchestratorConfig::default();
        Self {
            select_retries: config.select_retries,
            select_backoff_ms: config.select_backoff_ms,
            workflow_timeout_ms: config.workflow_timeout_ms,
            auto_feedback: config.auto_feedback,
        }
    }
}

/// Raw top-level configuration from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub scoring: FileScoringConfig,
    pub validation: FileValidationConfig,
    pub learning: FileLearningConfig,
    pub budget: FileBudgetConfig,
    pub router: FileRouterConfig,
    pub registry: FileRegistryConfig,
    pub bus: FileBusConfig,
    pub orchestrator: FileOrchestratorConfig,
    /// Operating mode the core starts in
    pub mode: OperatingMode,
    /// JSONL durable-store path; in-memory store when absent
    pub store_path: Option<String>,
    /// JSONL event-log path; event logging disabled when absent
    pub event_log_path: Option<String>,
}

impl FileConfig {
    /// Reject configurations that would misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let scoring = &self.scoring;
        if scoring.value < 0.0
            || scoring.cost < 0.0
            || scoring.learning < 0.0
            || scoring.constrained_cost_boost < 0.0
        {
            return Err(ConfigValidationError::NegativeScoringWeight);
        }
        if !(0.0..=1.0).contains(&self.router.escalation_floor) {
            return Err(ConfigValidationError::InvalidEscalationFloor);
        }
        if self.budget.daily_limit <= 0.0 || self.budget.per_request_max <= 0.0 {
            return Err(ConfigValidationError::NonPositiveBudget);
        }
        if self.bus.queue_capacity == 0 {
            return Err(ConfigValidationError::ZeroQueueCapacity);
        }
        if self.registry.heartbeat_interval_ms == 0 {
            return Err(ConfigValidationError::ZeroHeartbeatInterval);
        }
        Ok(())
    }

    /// Map the raw form into the application layer's resolved config.
    pub fn into_coordination(self) -> CoordinationConfig {
        CoordinationConfig {
            scoring: ScoringWeights {
                value: self.scoring.value,
                cost: self.scoring.cost,
                learning: self.scoring.learning,
                constrained_cost_boost: self.scoring.constrained_cost_boost,
                single_option_ceiling: self.scoring.single_option_ceiling,
            },
            validation: ValidationConfig {
                min_confidence: self.validation.min_confidence,
                min_rationale_chars: self.validation.min_rationale_chars,
                allowed_categories: self.validation.allowed_categories,
                cost_ceiling: self.validation.cost_ceiling,
            },
            learning: LearningParams {
                learning_rate: self.learning.learning_rate,
                recency_decay: self.learning.recency_decay,
            },
            budget: BudgetConfig {
                daily_limit: self.budget.daily_limit,
                per_request_max: self.budget.per_request_max,
            },
            router: RouterConfig {
                escalation_floor: self.router.escalation_floor,
                allow_budget_override: self.router.allow_budget_override,
            },
            registry: RegistryConfig {
                heartbeat: HeartbeatPolicy {
                    interval_ms: self.registry.heartbeat_interval_ms,
                    degraded_after: self.registry.degraded_after,
                    offline_after: self.registry.offline_after,
                },
                fitness: FitnessWeights::default(),
                max_load: self.registry.max_load,
                success_smoothing: self.registry.success_smoothing,
            },
            bus: BusConfig {
                queue_capacity: self.bus.queue_capacity,
            },
            orchestrator: OrchestratorConfig {
                select_retries: self.orchestrator.select_retries,
                select_backoff_ms: self.orchestrator.select_backoff_ms,
                workflow_timeout_ms: self.orchestrator.workflow_timeout_ms,
                auto_feedback: self.orchestrator.auto_feedback,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        FileConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_escalation_floor_rejected() {
        let mut config = FileConfig::default();
        config.router.escalation_floor = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidEscalationFloor)
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = FileConfig::default();
        config.budget.daily_limit = 2.5;
        config.mode = OperatingMode::Constrained;

        let serialized = toml::to_string(&config).unwrap();
        let restored: FileConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(restored.budget.daily_limit, 2.5);
        assert_eq!(restored.mode, OperatingMode::Constrained);
    }

    #[test]
    fn test_partial_file_uses_defaults_elsewhere() {
        let restored: FileConfig = toml::from_str("[budget]\ndaily_limit = 9.0\n").unwrap();
        assert_eq!(restored.budget.daily_limit, 9.0);
        assert_eq!(
            restored.budget.per_request_max,
            FileBudgetConfig::default().per_request_max
        );
        assert_eq!(restored.mode, OperatingMode::Normal);
    }

    #[test]
    fn test_mapping_into_coordination() {
        let mut config = FileConfig::default();
        config.scoring.cost = 0.5;
        config.registry.heartbeat_interval_ms = 1_000;

        let coordination = config.into_coordination();
        assert_eq!(coordination.scoring.cost, 0.5);
        assert_eq!(coordination.registry.heartbeat.interval_ms, 1_000);
    }
}
