/// Database configuration and connection management
pub mod database;

/// Seed catalog (tasks, achievements, products) loading from config.toml
pub mod catalog;

/// Runtime settings loaded from environment variables
pub mod settings;

pub use catalog::Catalog;
pub use settings::{CachePolicySetting, Environment, Settings};
