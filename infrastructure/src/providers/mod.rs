//! Inference backend adapters
//!
//! Tier-keyed implementations of the application's `InferenceBackend` port.
//! Only the deterministic simulated provider ships here; a real provider
//! plugs in behind the same trait.

pub mod simulated;

pub use simulated::SimulatedBackend;
