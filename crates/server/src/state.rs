//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

use udyami_agent::ConversationEngine;
use udyami_config::Settings;

use crate::session::{InMemorySessionStore, SessionStore};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Turn machinery shared by every conversation
    pub engine: Arc<ConversationEngine>,
    pub sessions: Arc<dyn SessionStore>,
    /// Prometheus renderer; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
    started_at: Instant,
}

impl AppState {
    /// Create application state with an in-memory session store sized from config
    pub fn new(config: Settings, engine: Arc<ConversationEngine>) -> Self {
        let store = InMemorySessionStore::new(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_ttl_secs),
        );
        Self::with_session_store(config, engine, Arc::new(store))
    }

    pub fn with_session_store(config: Settings, engine: Arc<ConversationEngine>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            sessions: store,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
