//! Event domain types
//!
//! Events are the coordination fabric between agents and pipeline stages.
//! They are immutable once published; delivery semantics (at-most-once,
//! per-source ordering, priority-aware drop) live in the application layer's
//! event bus.

pub mod entities;

pub use entities::{Event, EventKind, EventPriority};
