//! Configuration loading
//!
//! Raw TOML config types and the multi-source loader. The raw form maps
//! into the application layer's `CoordinationConfig` after validation.

pub mod file_config;
pub mod loader;

pub use file_config::{ConfigValidationError, FileConfig};
pub use loader::ConfigLoader;
