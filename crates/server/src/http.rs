//! HTTP Endpoints
//!
//! REST API for the navigator.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use udyami_agent::{Conversation, ConversationSnapshot, ScenarioComparison};
use udyami_core::{SlotKey, StructuredResponse};

use crate::metrics::metrics_handler;
use crate::session::Session;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        // Session endpoints
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/restore", post(restore_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/turn", post(turn))
        .route("/api/sessions/:id/snapshot", get(export_snapshot))
        .route("/api/sessions/:id/scenario", post(scenario))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// Disabled CORS is permissive; an empty or unparseable origin list falls
/// back to localhost:3000.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods(methods)
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

async fn find_session(state: &AppState, id: &str) -> Result<Arc<Session>, ServerError> {
    state
        .sessions
        .get(id)
        .await?
        .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

/// Start a conversation
async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionCreated>), ServerError> {
    let session = Arc::new(Session::generate(Conversation::new(state.engine.clone())));
    let session_id = session.id.clone();
    state.sessions.insert(session).await?;
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

/// Session summary
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = find_session(&state, &id).await?;
    let conversation = session.conversation().await;

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "phase": conversation.phase(),
        "intent": conversation.intent(),
        "language": conversation.language(),
        "turn_count": conversation.turns().len(),
        "idle_secs": session.idle_for().as_secs(),
    })))
}

/// End a conversation
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ServerError> {
    match state.sessions.remove(&id).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ServerError::SessionNotFound(id)),
    }
}

#[derive(Debug, Deserialize)]
struct TurnRequest {
    utterance: String,
}

/// Process one user turn
///
/// A retrieval still running for this session's previous turn is cancelled
/// before the new turn queues for the conversation lock.
async fn turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<StructuredResponse>, ServerError> {
    let session = find_session(&state, &id).await?;
    session.cancel_in_flight();

    let mut conversation = session.conversation().await;
    session.touch();
    let response = conversation.handle_turn(&request.utterance).await?;

    tracing::debug!(
        session_id = %id,
        turn = response.turn_index,
        kind = ?response.kind,
        phase = ?response.phase,
        "Turn handled"
    );
    Ok(Json(response))
}

/// Export the conversation state
async fn export_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSnapshot>, ServerError> {
    let session = find_session(&state, &id).await?;
    let snapshot = session.conversation().await.snapshot();
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    snapshot: serde_json::Value,
}

/// Start a new session from an exported snapshot
async fn restore_session(
    State(state): State<AppState>,
    Json(request): Json<RestoreRequest>,
) -> Result<(StatusCode, Json<SessionCreated>), ServerError> {
    let snapshot: ConversationSnapshot = serde_json::from_value(request.snapshot)
        .map_err(|e| ServerError::InvalidRequest(format!("snapshot: {}", e)))?;
    let conversation = Conversation::restore(state.engine.clone(), snapshot)?;

    let session = Arc::new(Session::generate(conversation));
    let session_id = session.id.clone();
    state.sessions.insert(session).await?;
    tracing::info!(session_id = %session_id, "Restored session from snapshot");
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

#[derive(Debug, Deserialize)]
struct ScenarioRequest {
    slot: SlotKey,
    utterance: String,
}

/// What-if comparison against the session's current profile
async fn scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ScenarioRequest>,
) -> Result<Json<ScenarioComparison>, ServerError> {
    let session = find_session(&state, &id).await?;
    let conversation = session.conversation().await;
    session.touch();
    let comparison = conversation.simulate(request.slot, &request.utterance).await?;
    Ok(Json(comparison))
}

/// Liveness
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.count().await,
        "uptime_secs": state.uptime().as_secs(),
    }))
}
