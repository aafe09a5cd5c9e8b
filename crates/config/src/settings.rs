//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use udyami_core::ContradictionPolicy;

use crate::constants::{composer, endpoints, planner, policy, retrieval, session};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Dialogue engine policy
    #[serde(default)]
    pub engine: EngineConfig,

    /// Knowledge retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Optional YAML file overriding the built-in domain tables
    #[serde(default)]
    pub domain_path: Option<PathBuf>,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_engine()?;
        self.validate_retrieval()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "At least one session must be allowed".to_string(),
            });
        }
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;

        if engine.speed_mode_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.speed_mode_cap".to_string(),
                message: "Must allow at least one question".to_string(),
            });
        }

        if !(1..=3).contains(&engine.max_schemes_per_category) {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_schemes_per_category".to_string(),
                message: format!("Must be between 1 and 3, got {}", engine.max_schemes_per_category),
            });
        }

        if !(0.0..=1.0).contains(&engine.post_compose_decay) {
            return Err(ConfigError::InvalidValue {
                field: "engine.post_compose_decay".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", engine.post_compose_decay),
            });
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;

        if r.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.timeout_ms".to_string(),
                message: "Timeout must be non-zero".to_string(),
            });
        }

        if r.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.top_k".to_string(),
                message: "top_k must be at least 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&r.min_score) {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.min_score".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", r.min_score),
            });
        }

        if r.staleness_days <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.staleness_days".to_string(),
                message: "Staleness threshold must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty allows any)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time after which a session is dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_host() -> String {
    endpoints::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    endpoints::DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_sessions() -> usize {
    session::MAX_SESSIONS
}

fn default_session_ttl() -> u64 {
    session::TTL_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
            max_sessions: default_max_sessions(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

/// Dialogue engine policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots quick mode may still ask
    pub speed_mode_cap: usize,
    /// Schemes shown per category
    pub max_schemes_per_category: usize,
    /// Ladder steps a band may move and still count as a refinement
    pub band_tolerance: u8,
    /// Years a start year may drift and still count as a refinement
    pub start_year_tolerance: u16,
    /// Years a stated age may drift and still count as a refinement
    pub age_tolerance: u8,
    /// Decay applied to the active intent's confidence after composing
    pub post_compose_decay: f32,
    /// Ask name and age at conversation start
    pub personalization: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed_mode_cap: planner::SPEED_MODE_CAP,
            max_schemes_per_category: composer::MAX_SCHEMES_PER_CATEGORY,
            band_tolerance: policy::BAND_TOLERANCE,
            start_year_tolerance: policy::START_YEAR_TOLERANCE,
            age_tolerance: policy::AGE_TOLERANCE,
            post_compose_decay: planner::POST_COMPOSE_DECAY,
            personalization: true,
        }
    }
}

impl EngineConfig {
    pub fn contradiction_policy(&self) -> ContradictionPolicy {
        ContradictionPolicy {
            band_tolerance: self.band_tolerance,
            start_year_tolerance: self.start_year_tolerance,
            age_tolerance: self.age_tolerance,
        }
    }
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Bound on each knowledge service call
    pub timeout_ms: u64,
    /// Corpus age (days) after which a fresh lookup is allowed
    pub staleness_days: i64,
    pub top_k: usize,
    pub min_score: f32,
    /// Allow the secondary freshness lookup at all
    pub fresh_search_enabled: bool,
    /// YAML scheme corpus for the in-memory index
    pub knowledge_path: Option<PathBuf>,
    /// Base URL of an external knowledge service
    pub service_url: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: retrieval::TIMEOUT_MS,
            staleness_days: retrieval::STALENESS_DAYS,
            top_k: retrieval::DEFAULT_TOP_K,
            min_score: retrieval::DEFAULT_MIN_SCORE,
            fresh_search_enabled: true,
            knowledge_path: None,
            service_url: None,
        }
    }
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_json: bool,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings rooted at `dir`: `{dir}/default`, then `{dir}/{env}`, then
/// `UDYAMI__*` environment variables
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("UDYAMI")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.engine.speed_mode_cap, 3);
        assert_eq!(settings.retrieval.top_k, 20);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.engine.max_schemes_per_category = 5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "engine.max_schemes_per_category"
        ));

        let mut settings = Settings::default();
        settings.retrieval.min_score = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retrieval.timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_contradiction_policy_from_engine() {
        let engine = EngineConfig {
            band_tolerance: 1,
            ..EngineConfig::default()
        };
        let policy = engine.contradiction_policy();
        assert_eq!(policy.band_tolerance, 1);
        assert_eq!(policy.start_year_tolerance, 1);
        assert_eq!(policy.age_tolerance, 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "server:\n  port: 9191\nengine:\n  band_tolerance: 1\nretrieval:\n  staleness_days: 30"
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.engine.band_tolerance, 1);
        assert_eq!(settings.retrieval.staleness_days, 30);
        assert_eq!(settings.retrieval.top_k, 20);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "retrieval:\n  top_k: 0\n").unwrap();
        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}
