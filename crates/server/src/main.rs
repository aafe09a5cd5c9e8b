//! Udyami Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use udyami_agent::ConversationEngine;
use udyami_config::{load_settings, Settings};
use udyami_core::KnowledgeService;
use udyami_rag::{HttpKnowledgeConfig, HttpKnowledgeService, InMemorySchemeIndex, KnowledgeLoader};
use udyami_server::{create_router, init_metrics, start_cleanup_task, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("UDYAMI_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting Udyami Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_env = env.as_deref().unwrap_or("default"),
        domain = ?config.domain_path,
        "Configuration loaded"
    );

    let service = build_knowledge_service(&config)?;
    let engine = Arc::new(ConversationEngine::from_settings(&config, service)?);

    let mut state = AppState::new(config.clone(), engine);
    if config.observability.metrics_enabled {
        if let Some(handle) = init_metrics() {
            tracing::info!("Initialized Prometheus metrics at /metrics");
            state = state.with_metrics(handle);
        }
    }

    let cleanup_interval = Duration::from_secs((config.server.session_ttl_secs / 4).clamp(1, 300));
    let cleanup = start_cleanup_task(state.sessions.clone(), cleanup_interval);

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Remote service when a URL is configured, otherwise the in-process index
fn build_knowledge_service(config: &Settings) -> Result<Arc<dyn KnowledgeService>, udyami_rag::RagError> {
    if let Some(url) = &config.retrieval.service_url {
        let service = HttpKnowledgeService::new(HttpKnowledgeConfig::new(url.as_str()))?;
        tracing::info!(url = %service.base_url(), "Using remote knowledge service");
        return Ok(Arc::new(service));
    }

    let index = match &config.retrieval.knowledge_path {
        Some(path) => InMemorySchemeIndex::new(KnowledgeLoader::load(path)?),
        None => InMemorySchemeIndex::builtin()?,
    };
    tracing::info!(schemes = index.len(), "Using in-process scheme index");
    Ok(Arc::new(index))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("udyami={level},udyami_server={level},udyami_agent={level},udyami_rag={level},tower_http=debug").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
