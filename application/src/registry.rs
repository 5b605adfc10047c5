//! Agent registry
//!
//! Capability-to-agent mapping with health tracking and best-fit selection.
//! Selection blends current load, rolling success rate, and context affinity
//! (see `agora_domain::agent::fitness`); Offline agents are never selected.

use crate::ports::agent::Agent;
use agora_domain::{
    AgentDescriptor, AgentStatus, Capability, Event, EventKind, EventPriority, FitnessWeights,
    HeartbeatPolicy, fitness_score, util::current_timestamp,
};
use crate::bus::EventBus;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Registry tuning knobs
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub heartbeat: HeartbeatPolicy,
    pub fitness: FitnessWeights,
    /// Load count at which an agent's load score bottoms out
    pub max_load: usize,
    /// EWMA factor for the rolling success rate
    pub success_smoothing: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatPolicy::default(),
            fitness: FitnessWeights::default(),
            max_load: 8,
            success_smoothing: 0.2,
        }
    }
}

struct AgentEntry {
    descriptor: AgentDescriptor,
    handle: Arc<dyn Agent>,
    load: usize,
    success_rate: f64,
}

/// A selection candidate returned by `find`
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub agent_id: String,
    pub status: AgentStatus,
    pub fitness: f64,
}

/// Capability → agent mapping with health tracking
pub struct AgentRegistry {
    config: RegistryConfig,
    bus: Arc<EventBus>,
    agents: RwLock<HashMap<String, AgentEntry>>,
}

impl AgentRegistry {
    pub fn new(config: RegistryConfig, bus: Arc<EventBus>) -> Self {
        Self {
            config,
            bus,
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register an agent under its descriptor's id. Re-registering replaces
    /// the handle and resets health.
    pub async fn register(&self, handle: Arc<dyn Agent>) {
        let descriptor = handle.descriptor();
        let agent_id = descriptor.agent_id.clone();
        info!(agent = %agent_id, "Agent registered");
        self.publish_health(&agent_id, AgentStatus::Active);

        let mut agents = self.agents.write().await;
        agents.insert(
            agent_id,
            AgentEntry {
                descriptor,
                handle,
                load: 0,
                success_rate: 0.5,
            },
        );
    }

    pub async fn deregister(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.remove(agent_id).is_some();
        if removed {
            info!(agent = %agent_id, "Agent deregistered");
        }
        removed
    }

    /// Record a heartbeat, restoring the agent to Active.
    pub async fn heartbeat(&self, agent_id: &str) -> bool {
        let previous = {
            let mut agents = self.agents.write().await;
            match agents.get_mut(agent_id) {
                Some(entry) => {
                    let was = entry.descriptor.status;
                    entry.descriptor.record_heartbeat(current_timestamp());
                    Some(was)
                }
                None => None,
            }
        };
        match previous {
            Some(was) => {
                if was != AgentStatus::Active {
                    self.publish_health(agent_id, AgentStatus::Active);
                }
                true
            }
            None => false,
        }
    }

    /// Apply the missed-heartbeat policy to every agent, publishing a health
    /// event for each status change. Returns the ids that changed.
    pub async fn sweep(&self, now: u64) -> Vec<(String, AgentStatus)> {
        let mut changed = Vec::new();
        {
            let mut agents = self.agents.write().await;
            for (agent_id, entry) in agents.iter_mut() {
                if let Some(status) = entry.descriptor.apply_policy(&self.config.heartbeat, now) {
                    warn!(agent = %agent_id, status = %status, "Agent health changed");
                    changed.push((agent_id.clone(), status));
                }
            }
        }
        for (agent_id, status) in &changed {
            self.publish_health(agent_id, *status);
        }
        changed
    }

    /// All selectable holders of a capability, best fitness first.
    pub async fn find(&self, capability: Capability, context_tags: &HashSet<String>) -> Vec<Candidate> {
        let agents = self.agents.read().await;
        let mut candidates: Vec<Candidate> = agents
            .values()
            .filter(|entry| {
                entry.descriptor.has_capability(capability)
                    && entry.descriptor.status.is_selectable()
            })
            .map(|entry| Candidate {
                agent_id: entry.descriptor.agent_id.clone(),
                status: entry.descriptor.status,
                fitness: fitness_score(
                    &entry.descriptor,
                    entry.load,
                    self.config.max_load,
                    entry.success_rate,
                    context_tags,
                    &self.config.fitness,
                ),
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.fitness
                .partial_cmp(&a.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }

    /// Best-fit healthy agent for the capability, or `None` when no healthy
    /// candidate exists (the caller escalates: retry with backoff, then
    /// CapacityUnavailable).
    pub async fn select_best(
        &self,
        capability: Capability,
        context_tags: &HashSet<String>,
    ) -> Option<(String, Arc<dyn Agent>)> {
        self.select_best_excluding(capability, context_tags, &HashSet::new())
            .await
    }

    /// Like `select_best`, skipping the given ids. Used for backup lookup
    /// after a delegate failure.
    pub async fn select_best_excluding(
        &self,
        capability: Capability,
        context_tags: &HashSet<String>,
        excluded: &HashSet<String>,
    ) -> Option<(String, Arc<dyn Agent>)> {
        let candidates = self.find(capability, context_tags).await;
        let chosen = candidates
            .into_iter()
            .find(|c| !excluded.contains(&c.agent_id))?;
        let agents = self.agents.read().await;
        let entry = agents.get(&chosen.agent_id)?;
        debug!(agent = %chosen.agent_id, capability = %capability, fitness = chosen.fitness, "Agent selected");
        Some((chosen.agent_id.clone(), Arc::clone(&entry.handle)))
    }

    /// Take a load lease for the agent (delegation started).
    pub async fn lease(&self, agent_id: &str) {
        if let Some(entry) = self.agents.write().await.get_mut(agent_id) {
            entry.load += 1;
        }
    }

    /// Return a load lease (delegation finished).
    pub async fn release(&self, agent_id: &str) {
        if let Some(entry) = self.agents.write().await.get_mut(agent_id) {
            entry.load = entry.load.saturating_sub(1);
        }
    }

    /// Feed an outcome into the agent's rolling success rate.
    pub async fn report_outcome(&self, agent_id: &str, success: bool) {
        let alpha = self.config.success_smoothing;
        if let Some(entry) = self.agents.write().await.get_mut(agent_id) {
            let observed = if success { 1.0 } else { 0.0 };
            entry.success_rate = entry.success_rate * (1.0 - alpha) + observed * alpha;
        }
    }

    /// Spawn the background task that runs [`Self::sweep`] once per
    /// heartbeat interval, driving the Active → Degraded → Offline policy
    /// for agents that stop checking in.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let registry = Arc::clone(self);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let period = Duration::from_millis(registry.config.heartbeat.interval_ms.max(1));
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.sweep(current_timestamp()).await;
                    }
                }
            }
        });
        SweeperHandle { token, join }
    }

    pub async fn descriptor(&self, agent_id: &str) -> Option<AgentDescriptor> {
        self.agents
            .read()
            .await
            .get(agent_id)
            .map(|entry| entry.descriptor.clone())
    }

    fn publish_health(&self, agent_id: &str, status: AgentStatus) {
        let priority = match status {
            AgentStatus::Offline => EventPriority::Critical,
            AgentStatus::Degraded => EventPriority::High,
            AgentStatus::Active => EventPriority::Normal,
        };
        self.bus.publish(
            Event::new(
                EventKind::AgentHealth,
                "registry",
                json!({ "agent_id": agent_id, "status": status.as_str() }),
            )
            .with_priority(priority),
        );
    }
}

/// Handle to the background health sweeper
pub struct SweeperHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Cancel the sweep task and wait for it to finish.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent::AgentError;
    use crate::ports::connector::ExecutionReport;
    use agora_domain::{Decision, DecisionOption, OperatingMode, SubTaskSpec};
    use async_trait::async_trait;

    struct StubAgent {
        descriptor: AgentDescriptor,
    }

    impl StubAgent {
        fn new(id: &str, capability: Capability) -> Arc<Self> {
            Arc::new(Self {
                descriptor: AgentDescriptor::new(id, [capability]),
            })
        }

        fn with_tags(id: &str, capability: Capability, tags: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                descriptor: AgentDescriptor::new(id, [capability])
                    .with_affinity_tags(tags.iter().map(|t| t.to_string())),
            })
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn descriptor(&self) -> AgentDescriptor {
            self.descriptor.clone()
        }

        async fn assess(
            &self,
            sub_task: &SubTaskSpec,
            _mode: OperatingMode,
        ) -> Result<Vec<DecisionOption>, AgentError> {
            Ok(sub_task.options.clone())
        }

        async fn perform(&self, _decision: &Decision) -> Result<ExecutionReport, AgentError> {
            Ok(ExecutionReport::succeeded(0.0, 0.9, "ok"))
        }
    }

    fn registry() -> AgentRegistry {
        AgentRegistry::new(RegistryConfig::default(), Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn test_find_filters_by_capability() {
        let registry = registry();
        registry.register(StubAgent::new("pricer", Capability::Pricing)).await;
        registry.register(StubAgent::new("lister", Capability::Listing)).await;

        let candidates = registry.find(Capability::Pricing, &HashSet::new()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].agent_id, "pricer");
    }

    #[tokio::test]
    async fn test_select_best_none_when_no_healthy_agent() {
        let registry = registry();
        assert!(
            registry
                .select_best(Capability::Pricing, &HashSet::new())
                .await
                .is_none()
        );

        // An agent that went offline is equally unavailable
        registry.register(StubAgent::new("pricer", Capability::Pricing)).await;
        let far_future = current_timestamp() + 10 * 60 * 1000;
        registry.sweep(far_future).await;
        assert!(
            registry
                .select_best(Capability::Pricing, &HashSet::new())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sweep_degrades_then_offlines() {
        let registry = registry();
        registry.register(StubAgent::new("pricer", Capability::Pricing)).await;

        let policy = RegistryConfig::default().heartbeat;
        let registered_at = registry.descriptor("pricer").await.unwrap().last_seen;

        let degraded_at = registered_at + policy.interval_ms * policy.degraded_after as u64;
        let changes = registry.sweep(degraded_at).await;
        assert_eq!(changes, vec![("pricer".to_string(), AgentStatus::Degraded)]);

        let offline_at = registered_at + policy.interval_ms * policy.offline_after as u64;
        let changes = registry.sweep(offline_at).await;
        assert_eq!(changes, vec![("pricer".to_string(), AgentStatus::Offline)]);
    }

    #[tokio::test]
    async fn test_background_sweeper_offlines_silent_agent() {
        let config = RegistryConfig {
            heartbeat: HeartbeatPolicy {
                interval_ms: 20,
                degraded_after: 1,
                offline_after: 2,
            },
            ..Default::default()
        };
        let registry = Arc::new(AgentRegistry::new(config, Arc::new(EventBus::default())));
        registry.register(StubAgent::new("pricer", Capability::Pricing)).await;

        let sweeper = registry.start_sweeper();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            registry.descriptor("pricer").await.unwrap().status,
            AgentStatus::Offline
        );
        assert!(
            registry
                .select_best(Capability::Pricing, &HashSet::new())
                .await
                .is_none()
        );
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_heartbeat_revives_degraded_agent() {
        let registry = registry();
        registry.register(StubAgent::new("pricer", Capability::Pricing)).await;
        let far = current_timestamp() + 60_000;
        registry.sweep(far).await;
        assert_eq!(
            registry.descriptor("pricer").await.unwrap().status,
            AgentStatus::Offline
        );

        registry.heartbeat("pricer").await;
        assert_eq!(
            registry.descriptor("pricer").await.unwrap().status,
            AgentStatus::Active
        );
    }

    #[tokio::test]
    async fn test_selection_prefers_less_loaded_agent() {
        let registry = registry();
        registry.register(StubAgent::new("busy", Capability::Pricing)).await;
        registry.register(StubAgent::new("idle", Capability::Pricing)).await;

        for _ in 0..5 {
            registry.lease("busy").await;
        }

        let (chosen, _) = registry
            .select_best(Capability::Pricing, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(chosen, "idle");
    }

    #[tokio::test]
    async fn test_selection_prefers_affinity_match() {
        let registry = registry();
        registry.register(StubAgent::new("generic", Capability::Pricing)).await;
        registry
            .register(StubAgent::with_tags("specialist", Capability::Pricing, &["electronics"]))
            .await;

        let tags: HashSet<String> = ["electronics".to_string()].into_iter().collect();
        let (chosen, _) = registry.select_best(Capability::Pricing, &tags).await.unwrap();
        assert_eq!(chosen, "specialist");
    }

    #[tokio::test]
    async fn test_failures_lower_selection_rank() {
        let registry = registry();
        registry.register(StubAgent::new("flaky", Capability::Pricing)).await;
        registry.register(StubAgent::new("steady", Capability::Pricing)).await;

        for _ in 0..10 {
            registry.report_outcome("flaky", false).await;
            registry.report_outcome("steady", true).await;
        }

        let (chosen, _) = registry
            .select_best(Capability::Pricing, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(chosen, "steady");
    }

    #[tokio::test]
    async fn test_excluding_primary_selects_backup() {
        let registry = registry();
        registry.register(StubAgent::new("primary", Capability::Pricing)).await;
        registry.register(StubAgent::new("backup", Capability::Pricing)).await;

        let excluded: HashSet<String> = ["primary".to_string()].into_iter().collect();
        let found = registry
            .select_best_excluding(Capability::Pricing, &HashSet::new(), &excluded)
            .await;
        assert_eq!(found.unwrap().0, "backup");
    }
}
