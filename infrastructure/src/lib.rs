//! Infrastructure layer for agora
//!
//! Adapters implementing the application layer's ports: durable stores
//! (in-memory and JSONL), simulated inference backends and connectors, the
//! router-backed worker agent, configuration loading, and the JSONL event
//! log. Nothing here is referenced by the domain or application layers —
//! dependencies point strictly inward.

pub mod agents;
pub mod config;
pub mod connectors;
pub mod logging;
pub mod providers;
pub mod store;

pub use agents::WorkerAgent;
pub use config::{ConfigLoader, FileConfig};
pub use connectors::SimulatedConnector;
pub use logging::{EventLogHandle, JsonlEventLog};
pub use providers::SimulatedBackend;
pub use store::{InMemoryStore, JsonlStore};
