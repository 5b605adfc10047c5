//! Durable store adapters
//!
//! Implementations of the application's `DurableStore` port: an in-memory
//! store for tests and demos (with a reachability toggle to exercise the
//! offline-queue path) and an append-only JSONL file store.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlStore;
pub use memory::InMemoryStore;
