//! Agent descriptor and health entities

use super::capability::Capability;
use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Health status of a registered agent (Value Object)
///
/// Transitions are driven by the missed-heartbeat policy:
/// `Active -> Degraded -> Offline`, and back to `Active` on any heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Degraded,
    Offline,
}

impl AgentStatus {
    /// Offline agents are excluded from selection entirely.
    pub fn is_selectable(&self) -> bool {
        !matches!(self, AgentStatus::Offline)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Degraded => "degraded",
            AgentStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Missed-heartbeat policy (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatPolicy {
    /// Expected interval between heartbeats, in milliseconds
    pub interval_ms: u64,
    /// Missed intervals before Active becomes Degraded
    pub degraded_after: u32,
    /// Missed intervals before Degraded becomes Offline
    pub offline_after: u32,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            degraded_after: 2,
            offline_after: 4,
        }
    }
}

impl HeartbeatPolicy {
    /// Status implied by the time elapsed since the last heartbeat
    pub fn status_for(&self, last_seen: u64, now: u64) -> AgentStatus {
        let elapsed = now.saturating_sub(last_seen);
        let missed = elapsed / self.interval_ms.max(1);
        if missed >= self.offline_after as u64 {
            AgentStatus::Offline
        } else if missed >= self.degraded_after as u64 {
            AgentStatus::Degraded
        } else {
            AgentStatus::Active
        }
    }
}

/// A registered agent's descriptor (Entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    pub capabilities: HashSet<Capability>,
    pub status: AgentStatus,
    /// Affinity tags matched against task context for selection
    #[serde(default)]
    pub affinity_tags: HashSet<String>,
    /// Milliseconds since epoch of the last heartbeat
    pub last_seen: u64,
}

impl AgentDescriptor {
    pub fn new(agent_id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities: capabilities.into_iter().collect(),
            status: AgentStatus::Active,
            affinity_tags: HashSet::new(),
            last_seen: current_timestamp(),
        }
    }

    pub fn with_affinity_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.affinity_tags = tags.into_iter().collect();
        self
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Record a heartbeat: refresh `last_seen` and restore Active status.
    pub fn record_heartbeat(&mut self, now: u64) {
        self.last_seen = now;
        self.status = AgentStatus::Active;
    }

    /// Re-evaluate status against the heartbeat policy. Returns the new
    /// status if it changed.
    pub fn apply_policy(&mut self, policy: &HeartbeatPolicy, now: u64) -> Option<AgentStatus> {
        let implied = policy.status_for(self.last_seen, now);
        if implied != self.status {
            self.status = implied;
            Some(implied)
        } else {
            None
        }
    }
}
