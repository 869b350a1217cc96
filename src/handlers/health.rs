use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{error, warn};

use crate::{utils::time::now_unix, utils::CallContext, AppState};

/// Deadline for the readiness store ping.
const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness fails once readiness has not succeeded for this long.
const LIVENESS_STALE_AFTER_SECS: i64 = 300;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Time of the last successful readiness check, in Unix seconds.
#[derive(Debug)]
pub struct ReadinessTracker {
    last_ready: AtomicI64,
}

impl ReadinessTracker {
    /// Starts as if ready now so a fresh process gets a full grace period.
    pub fn new() -> Self {
        Self::starting_at(now_unix())
    }

    pub fn starting_at(unix_seconds: i64) -> Self {
        Self {
            last_ready: AtomicI64::new(unix_seconds),
        }
    }

    pub fn mark_ready(&self, unix_seconds: i64) {
        self.last_ready.store(unix_seconds, Ordering::Relaxed);
    }

    pub fn last_ready(&self) -> i64 {
        self.last_ready.load(Ordering::Relaxed)
    }

    pub fn is_alive(&self, now: i64) -> bool {
        now - self.last_ready() < LIVENESS_STALE_AFTER_SECS
    }
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Pings the store; a success refreshes the liveness clock.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let ctx = CallContext::new().with_timeout(READINESS_TIMEOUT);
    let outcome = ctx.run(state.store.health_check()).await;

    match outcome {
        Ok(Ok(())) => {
            state.readiness.mark_ready(now_unix());
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ready",
                    "backend": state.store.backend_name(),
                    "timestamp": Utc::now().to_rfc3339()
                })),
            )
                .into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "Readiness check failed");
            not_ready(state.store.backend_name(), e.to_string())
        }
        Err(interrupted) => {
            warn!(error = %interrupted, "Readiness check interrupted");
            not_ready(state.store.backend_name(), interrupted.to_string())
        }
    }
}

fn not_ready(backend: &str, reason: String) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "not_ready",
            "backend": backend,
            "reason": reason,
            "timestamp": Utc::now().to_rfc3339()
        })),
    )
        .into_response()
}

pub async fn liveness(State(state): State<AppState>) -> Response {
    let last_ready = state.readiness.last_ready();

    if state.readiness.is_alive(now_unix()) {
        (
            StatusCode::OK,
            Json(json!({ "status": "alive", "last_ready": last_ready })),
        )
            .into_response()
    } else {
        warn!(last_ready, "Liveness failing: readiness stale");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "stale", "last_ready": last_ready })),
        )
            .into_response()
    }
}

pub fn create_health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/liveness", get(liveness))
        .route("/readiness", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_window() {
        let tracker = ReadinessTracker::starting_at(1_000);
        assert!(tracker.is_alive(1_000));
        assert!(tracker.is_alive(1_299));
        assert!(!tracker.is_alive(1_300));

        tracker.mark_ready(1_300);
        assert!(tracker.is_alive(1_400));
    }
}
