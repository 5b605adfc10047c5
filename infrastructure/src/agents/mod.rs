//! Agent implementations
//!
//! Concrete agents satisfying the application's `Agent` port. The worker
//! agent wires the model router (reasoning) to an action executor (doing).

pub mod worker;

pub use worker::WorkerAgent;
