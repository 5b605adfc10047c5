//! Logging adapters
//!
//! The JSONL event log subscribes to the bus and appends every event as one
//! JSON line, giving an auditable trace of the core's activity.

pub mod event_log;

pub use event_log::{EventLogHandle, JsonlEventLog};
