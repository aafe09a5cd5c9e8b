//! Prometheus metrics
//!
//! The engine crates record through the `metrics` facade; this module installs
//! the Prometheus recorder and serves its text rendering.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` when a recorder is already installed (e.g. a second server
/// in the same process).
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            metrics::describe_counter!("udyami_turns_total", "User turns processed");
            metrics::describe_counter!("udyami_compositions_total", "Full responses composed");
            metrics::describe_counter!("udyami_retrieval_escalations_total", "Fresh lookups after a stale primary result");
            metrics::describe_histogram!("udyami_retrieval_latency_ms", "Knowledge retrieval latency");
            metrics::describe_counter!("udyami_http_errors_total", "Requests answered with an error status");
            Some(handle)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        },
    }
}

pub(crate) fn record_error(status: StatusCode) {
    metrics::counter!("udyami_http_errors_total", "status" => status.as_u16().to_string()).increment(1);
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled\n".to_string()),
    }
}
