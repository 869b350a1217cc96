pub mod health;
pub mod ingestion_handlers;
pub mod metrics;
pub mod price_handlers;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub use health::{health_check, liveness, readiness, ReadinessTracker};
pub use ingestion_handlers::trigger_ingestion;
pub use metrics::metrics_handler;
pub use price_handlers::{get_latest_price, get_price_history};

/// Success envelope shared by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(price_handlers::create_price_routes())
        .merge(ingestion_handlers::create_ingestion_routes())
        .merge(health::create_health_routes())
        .merge(metrics::create_metrics_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
