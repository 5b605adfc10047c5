//! Action executor adapters
//!
//! Leaf-action connectors implementing the application's `ActionExecutor`
//! port. The simulated connector stands in for marketplace integrations.

pub mod simulated;

pub use simulated::SimulatedConnector;
