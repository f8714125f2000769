//! Bristlemouth Common
//!
//! Common utilities shared by the Bristlemouth service layer crates.
//!
//! This crate provides:
//! - Component-based structured logging with node ID context
//! - Lazily formatting logging macros
//! - A typed key/value configuration store

pub mod config_store;
pub mod logging;
#[macro_use]
mod macros;

// Re-export traits and types at the root level
pub use config_store::{
    ConfigDataType, ConfigError, ConfigKey, ConfigStore, ConfigValue, MemoryConfigStore,
    SaveOutcome,
};
pub use logging::{Component, ComponentKey, LogLevel, Logger, LoggingConfig};
