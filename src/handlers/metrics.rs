use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::error;

use crate::{error::AppError, AppState};

/// Prometheus text exposition of the ingestion counters.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let metrics_text = state.pipeline.metrics().export().map_err(|e| {
        error!("Failed to export metrics: {}", e);
        e
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics_text,
    )
        .into_response())
}

pub fn create_metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
