use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::interval::Interval;

/// Seconds in the 24 hour lookback window and in the default history range.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A single price observation for one symbol.
///
/// `time` is the provider's own freshness timestamp in Unix seconds, not
/// the moment the row was ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PricePoint {
    pub symbol: String,
    pub price: BigDecimal,
    pub time: i64,
}

impl PricePoint {
    pub fn new(symbol: &str, price: BigDecimal, time: i64) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            price,
            time,
        }
    }
}

/// One fetch cycle's worth of observations, written atomically.
pub type Batch = Vec<PricePoint>;

/// Lowercase, trimmed ticker as stored in the time series.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// One aggregated row of a history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HistoryBucket {
    #[serde(rename = "startedAt")]
    pub bucket_start: i64,
    pub symbol: String,
    pub avg_price: BigDecimal,
    pub last_price: BigDecimal,
}

/// History request as received from a caller. Every field except the
/// symbol is optional and resolved by the query engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRequest {
    #[serde(default)]
    pub symbol: String,
    pub interval: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// Fully resolved history query handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub interval: Interval,
    /// Inclusive lower bound, Unix seconds.
    pub from: i64,
    /// Inclusive upper bound, Unix seconds.
    pub to: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestRequest {
    #[serde(default)]
    pub symbol: String,
}

/// Latest stored price with its change against the price 24 hours earlier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestPrice {
    pub symbol: String,
    pub price: BigDecimal,
    pub timestamp: i64,
    pub change_24h_pct: f64,
}
