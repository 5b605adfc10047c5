//! Event bus
//!
//! Typed publish/subscribe transport between agents and pipeline stages.

pub mod event_bus;

pub use event_bus::{BusConfig, EventBus, Subscription, TypePattern};
