//! Configuration management for the MSME scheme navigator
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`UDYAMI__` prefix, `__` separator)
//!
//! # Domain Configuration
//!
//! Intent requirements and question wording live in [`DomainConfig`]. The
//! built-in table is complete; `Settings::domain_path` points at an optional
//! YAML file that overrides parts of it.

pub mod constants;
pub mod domain;
pub mod settings;

pub use domain::{DomainConfig, IntentDefinition, SlotPrompt};
pub use settings::{
    load_settings, load_settings_from, EngineConfig, ObservabilityConfig, RetrievalConfig,
    ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for udyami_core::Error {
    fn from(err: ConfigError) -> Self {
        udyami_core::Error::Config(err.to_string())
    }
}
