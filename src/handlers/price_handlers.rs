use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
    routing::get,
    Router,
};
use tracing::debug;

use crate::{
    error::AppError,
    handlers::ApiResponse,
    models::{HistoryBucket, HistoryRequest, LatestPrice, LatestRequest},
    utils::CallContext,
    AppState,
};

/// GET /prices/latest?symbol=btc
pub async fn get_latest_price(
    State(state): State<AppState>,
    query: Result<Query<LatestRequest>, QueryRejection>,
) -> Result<Json<ApiResponse<LatestPrice>>, AppError> {
    let Query(request) = query?;
    debug!(symbol = %request.symbol, "Latest price requested");

    let ctx = CallContext::new().with_timeout(state.settings.query.latest_timeout());
    let latest = state.query.get_latest_with_change(&ctx, &request.symbol).await?;

    Ok(Json(ApiResponse::ok(latest)))
}

/// GET /prices/history?symbol=btc&interval=1h&from=..&to=..
pub async fn get_price_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryRequest>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<HistoryBucket>>>, AppError> {
    let Query(request) = query?;
    debug!(symbol = %request.symbol, interval = ?request.interval, "Price history requested");

    let ctx = CallContext::new().with_timeout(state.settings.query.history_timeout());
    let buckets = state.query.get_history(&ctx, request).await?;

    Ok(Json(ApiResponse::ok(buckets)))
}

pub fn create_price_routes() -> Router<AppState> {
    Router::new()
        .route("/prices/latest", get(get_latest_price))
        .route("/prices/history", get(get_price_history))
}
