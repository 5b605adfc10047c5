//! Ports: interfaces the application layer depends on
//!
//! Implementations (adapters) live in the infrastructure layer. The core
//! never talks to a marketplace, an inference backend, or a database
//! directly — only through these narrow traits.

pub mod agent;
pub mod connector;
pub mod durable_store;
pub mod inference;

pub use agent::{Agent, AgentError};
pub use connector::{ActionExecutor, ExecutionReport};
pub use durable_store::{DurableStore, StoreError, StoreFilter, StoreRecord};
pub use inference::{InferenceBackend, InferenceError, InferenceOutcome};
