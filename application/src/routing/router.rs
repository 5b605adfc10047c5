//! Cost-aware model router
//!
//! Picks the cheapest tier whose typical quality meets the task's
//! requirement, reserves its cost with the budget actor before calling,
//! and escalates one tier when the observed quality lands below the floor.

use crate::bus::EventBus;
use crate::ports::inference::{InferenceBackend, InferenceOutcome};
use crate::routing::budget_actor::BudgetHandle;
use agora_domain::{CoordinationError, Event, EventKind, EventPriority, ModelTier, RoutingDecision, TaskDescriptor};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the routing layer
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error("No backend registered for tier '{0}'")]
    NoBackend(ModelTier),

    #[error("Backend call failed: {0}")]
    Backend(String),
}

/// Router tuning knobs
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Observed quality below this triggers a one-shot escalation
    pub escalation_floor: f64,
    /// Allow reservations past the daily limit (operator escape hatch)
    pub allow_budget_override: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            escalation_floor: 0.6,
            allow_budget_override: false,
        }
    }
}

/// A completed routing: the record plus the final inference outcome
#[derive(Debug, Clone)]
pub struct RoutedInference {
    pub record: RoutingDecision,
    pub outcome: InferenceOutcome,
}

/// Routes inference requests across the tiered backends
pub struct ModelRouter {
    config: RouterConfig,
    budget: BudgetHandle,
    bus: Arc<EventBus>,
    backends: HashMap<ModelTier, Arc<dyn InferenceBackend>>,
}

impl ModelRouter {
    pub fn new(config: RouterConfig, budget: BudgetHandle, bus: Arc<EventBus>) -> Self {
        Self {
            config,
            budget,
            bus,
            backends: HashMap::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backends.insert(backend.tier(), backend);
        self
    }

    pub fn budget(&self) -> &BudgetHandle {
        &self.budget
    }

    /// Candidate tiers for a task: the preferred tier first, then cheaper
    /// fallbacks, dropping tiers over the task's own spend cap or without a
    /// registered backend.
    fn candidates(&self, task: &TaskDescriptor) -> Vec<ModelTier> {
        let preferred =
            ModelTier::cheapest_meeting(task.required_quality()).unwrap_or(ModelTier::Premium);
        let mut tiers: Vec<ModelTier> = ModelTier::all()
            .iter()
            .copied()
            .filter(|tier| *tier <= preferred)
            .filter(|tier| {
                task.max_cost
                    .is_none_or(|cap| tier.cost_per_call() <= cap)
            })
            .filter(|tier| self.backends.contains_key(tier))
            .collect();
        tiers.reverse();
        tiers
    }

    /// Route one request: select a tier, reserve its cost, call the backend,
    /// escalate once if the observed quality falls short.
    ///
    /// A budget rejection leaves spend untouched and emits a
    /// `BudgetRejected` event. A backend failure refunds the reservation.
    pub async fn route(&self, task: &TaskDescriptor) -> Result<RoutedInference, RoutingError> {
        let mut record = RoutingDecision::received(&task.id);

        let candidates = self.candidates(task);
        if candidates.is_empty() {
            record.reject();
            let preferred = ModelTier::cheapest_meeting(task.required_quality())
                .unwrap_or(ModelTier::Premium);
            return Err(RoutingError::NoBackend(preferred));
        }

        // Walk from the preferred tier down until a reservation is granted
        let mut selected = None;
        let mut last_rejection = None;
        for tier in candidates {
            match self
                .budget
                .try_reserve(tier.cost_per_call(), self.config.allow_budget_override)
                .await
            {
                Ok(()) => {
                    selected = Some(tier);
                    break;
                }
                Err(error @ CoordinationError::BudgetExceeded { .. }) => {
                    debug!(tier = %tier, %error, "Tier over budget, trying cheaper");
                    last_rejection = Some(error);
                }
                Err(error) => return Err(RoutingError::Coordination(error)),
            }
        }
        let Some(tier) = selected else {
            record.reject();
            let error = last_rejection.unwrap_or(CoordinationError::BudgetExceeded {
                requested: 0.0,
                remaining: 0.0,
            });
            warn!(task = %task.id, %error, "Routing rejected by budget");
            self.bus.publish(
                Event::new(
                    EventKind::BudgetRejected,
                    "router",
                    json!({ "task_id": task.id, "error": error.to_string() }),
                )
                .with_priority(EventPriority::High),
            );
            return Err(RoutingError::Coordination(error));
        };
        record.select_tier(tier, tier.cost_per_call());

        let backend = self
            .backends
            .get(&tier)
            .ok_or(RoutingError::NoBackend(tier))?;
        let mut outcome = match backend.call(task).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.budget.release(tier.cost_per_call()).await?;
                record.reject();
                return Err(RoutingError::Backend(error.to_string()));
            }
        };

        if outcome.observed_quality < self.config.escalation_floor
            && let Some(next) = tier.next_up()
            && task.max_cost.is_none_or(|cap| next.cost_per_call() <= cap)
            && let Some(upper) = self.backends.get(&next)
        {
            // Escalate only when the budget still covers the second attempt;
            // the first attempt stays charged either way.
            match self.budget.try_reserve(next.cost_per_call(), false).await {
                Ok(()) => match upper.call(task).await {
                    Ok(second) => {
                        info!(
                            task = %task.id,
                            from = %tier,
                            to = %next,
                            quality = outcome.observed_quality,
                            "Escalated after low quality"
                        );
                        record.escalate(next, next.cost_per_call());
                        outcome = second;
                    }
                    Err(error) => {
                        warn!(task = %task.id, %error, "Escalation call failed, keeping first result");
                        self.budget.release(next.cost_per_call()).await?;
                    }
                },
                Err(error) => {
                    debug!(task = %task.id, %error, "Escalation skipped, budget exhausted");
                }
            }
        }

        record.complete(outcome.observed_quality);
        self.bus.publish(Event::new(
            EventKind::RoutingCompleted,
            "router",
            json!({
                "task_id": task.id,
                "tier": record.chosen_tier.as_str(),
                "cost": record.estimated_cost,
                "quality": record.observed_quality,
                "escalated": record.escalated,
            }),
        ));
        Ok(RoutedInference { record, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::inference::InferenceError;
    use crate::routing::budget_actor::BudgetKeeper;
    use agora_domain::TaskComplexity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        tier: ModelTier,
        quality: f64,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(tier: ModelTier, quality: f64) -> Arc<Self> {
            Arc::new(Self {
                tier,
                quality,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(tier: ModelTier) -> Arc<Self> {
            Arc::new(Self {
                tier,
                quality: 0.0,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceBackend for FixedBackend {
        fn tier(&self) -> ModelTier {
            self.tier
        }

        async fn call(&self, task: &TaskDescriptor) -> Result<InferenceOutcome, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InferenceError::Unavailable("down".into()));
            }
            Ok(InferenceOutcome {
                content: format!("result for {}", task.id),
                observed_cost: self.tier.cost_per_call(),
                observed_quality: self.quality,
            })
        }
    }

    fn router_with(
        daily_limit: f64,
        backends: Vec<Arc<FixedBackend>>,
    ) -> ModelRouter {
        let budget = BudgetKeeper::spawn(daily_limit, 1.0);
        let mut router = ModelRouter::new(
            RouterConfig::default(),
            budget,
            Arc::new(EventBus::default()),
        );
        for backend in backends {
            router = router.with_backend(backend);
        }
        router
    }

    #[tokio::test]
    async fn test_low_complexity_routes_to_lite() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.7);
        let premium = FixedBackend::new(ModelTier::Premium, 0.95);
        let router = router_with(1.0, vec![Arc::clone(&lite), premium]);

        let task = TaskDescriptor::new("format the listing title");
        let routed = router.route(&task).await.unwrap();
        assert_eq!(routed.record.chosen_tier, ModelTier::Lite);
        assert!(!routed.record.escalated);
        assert_eq!(lite.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_high_complexity_routes_to_premium() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.7);
        let premium = FixedBackend::new(ModelTier::Premium, 0.95);
        let router = router_with(1.0, vec![lite, Arc::clone(&premium)]);

        let task = TaskDescriptor::new("negotiate bulk discount with supplier");
        let routed = router.route(&task).await.unwrap();
        assert_eq!(routed.record.chosen_tier, ModelTier::Premium);
        assert_eq!(premium.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_escalates_once_on_low_quality() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.3);
        let standard = FixedBackend::new(ModelTier::Standard, 0.8);
        let router = router_with(1.0, vec![Arc::clone(&lite), Arc::clone(&standard)]);

        let task = TaskDescriptor::new("extract the order number");
        let routed = router.route(&task).await.unwrap();
        assert!(routed.record.escalated);
        assert_eq!(routed.record.chosen_tier, ModelTier::Standard);
        // Both attempts charged
        let expected = ModelTier::Lite.cost_per_call() + ModelTier::Standard.cost_per_call();
        assert!((routed.record.estimated_cost - expected).abs() < 1e-12);
        assert_eq!(lite.calls.load(Ordering::SeqCst), 1);
        assert_eq!(standard.calls.load(Ordering::SeqCst), 1);

        let spent = router.budget().snapshot().await.unwrap().spent;
        assert!((spent - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_budget_rejection_leaves_spend_unchanged() {
        let premium = FixedBackend::new(ModelTier::Premium, 0.95);
        // Limit below the premium cost, no cheaper backend to fall back to
        let router = router_with(0.01, vec![premium]);

        let task = TaskDescriptor::new("x").with_complexity(TaskComplexity::High);
        let err = router.route(&task).await.unwrap_err();
        assert!(matches!(
            err,
            RoutingError::Coordination(CoordinationError::BudgetExceeded { .. })
        ));
        assert_eq!(router.budget().snapshot().await.unwrap().spent, 0.0);
    }

    #[tokio::test]
    async fn test_downgrades_when_preferred_tier_over_budget() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.7);
        let premium = FixedBackend::new(ModelTier::Premium, 0.95);
        // Premium (0.06) does not fit, Lite (0.002) does
        let router = router_with(0.01, vec![Arc::clone(&lite), premium]);

        let task = TaskDescriptor::new("x").with_complexity(TaskComplexity::High);
        let routed = router.route(&task).await.unwrap();
        assert_eq!(routed.record.chosen_tier, ModelTier::Lite);
        assert_eq!(lite.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_refunds_reservation() {
        let lite = FixedBackend::failing(ModelTier::Lite);
        let router = router_with(1.0, vec![lite]);

        let task = TaskDescriptor::new("lookup sku");
        let err = router.route(&task).await.unwrap_err();
        assert!(matches!(err, RoutingError::Backend(_)));
        assert_eq!(router.budget().snapshot().await.unwrap().spent, 0.0);
    }

    #[tokio::test]
    async fn test_per_task_cost_cap_filters_tiers() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.7);
        let standard = FixedBackend::new(ModelTier::Standard, 0.8);
        let router = router_with(1.0, vec![Arc::clone(&lite), standard]);

        // Cap below the standard cost forces lite despite medium complexity
        let task = TaskDescriptor::new("x")
            .with_complexity(TaskComplexity::Medium)
            .with_max_cost(0.005);
        let routed = router.route(&task).await.unwrap();
        assert_eq!(routed.record.chosen_tier, ModelTier::Lite);
    }

    #[tokio::test]
    async fn test_no_backend_for_any_candidate() {
        let router = router_with(1.0, vec![]);
        let task = TaskDescriptor::new("lookup sku");
        let err = router.route(&task).await.unwrap_err();
        assert!(matches!(err, RoutingError::NoBackend(_)));
    }

    #[tokio::test]
    async fn test_escalation_skipped_when_budget_exhausted() {
        let lite = FixedBackend::new(ModelTier::Lite, 0.3);
        let standard = FixedBackend::new(ModelTier::Standard, 0.8);
        // Enough for lite, not for the standard escalation
        let router = router_with(0.005, vec![Arc::clone(&lite), Arc::clone(&standard)]);

        let task = TaskDescriptor::new("extract the order number");
        let routed = router.route(&task).await.unwrap();
        assert!(!routed.record.escalated);
        assert_eq!(routed.record.chosen_tier, ModelTier::Lite);
        assert_eq!(standard.calls.load(Ordering::SeqCst), 0);
    }
}
