use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tracing::info;

use crate::{
    error::AppError,
    handlers::ApiResponse,
    services::IngestReport,
    utils::CallContext,
    AppState,
};

/// GET|POST /cron/update-prices
///
/// Runs one ingestion cycle inline. Dropping the request cancels the run.
pub async fn trigger_ingestion(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<IngestReport>>), AppError> {
    info!("Manual ingestion triggered");

    let ctx = CallContext::new().with_timeout(state.settings.ingestion.run_timeout());
    let report = state.pipeline.run(&ctx).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(report, "prices updated")),
    ))
}

pub fn create_ingestion_routes() -> Router<AppState> {
    Router::new().route("/cron/update-prices", get(trigger_ingestion).post(trigger_ingestion))
}
