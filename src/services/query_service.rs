use std::sync::Arc;
use tracing::{debug, info};

use crate::database::{PriceStore, StoreError};
use crate::models::{
    normalize_symbol, HistoryBucket, HistoryQuery, HistoryRequest, Interval, LatestPrice, SECONDS_PER_DAY,
};
use crate::utils::math::{percentage_change, to_f64_lossy};
use crate::utils::time::now_unix;
use crate::utils::{CallContext, Interrupted};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no prices found for symbol '{symbol}'")]
    NotFound { symbol: String },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("query canceled")]
    Canceled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for QueryError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Canceled => QueryError::Canceled,
            Interrupted::DeadlineExceeded => QueryError::DeadlineExceeded,
        }
    }
}

/// Read side: latest price with 24h change, and bucketed history.
pub struct QueryEngine {
    store: Arc<dyn PriceStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    pub async fn get_latest_with_change(&self, ctx: &CallContext, symbol: &str) -> Result<LatestPrice, QueryError> {
        let symbol = required_symbol(symbol)?;

        let latest = ctx
            .run(self.store.get_latest(&symbol))
            .await??
            .ok_or_else(|| {
                info!(symbol = %symbol, "No latest price found");
                QueryError::NotFound { symbol: symbol.clone() }
            })?;

        let lookback = latest.time.saturating_sub(SECONDS_PER_DAY);
        let baseline = ctx
            .run(self.store.get_price_at_or_before(&symbol, lookback))
            .await??;

        // No baseline or a zero baseline both report no change.
        let change_24h_pct = baseline
            .and_then(|base| percentage_change(&base, &latest.price))
            .map(|change| to_f64_lossy(&change))
            .unwrap_or(0.0);

        debug!(symbol = %symbol, price = %latest.price, change_24h_pct, "Latest price resolved");

        Ok(LatestPrice {
            symbol,
            price: latest.price,
            timestamp: latest.time,
            change_24h_pct,
        })
    }

    pub async fn get_history(&self, ctx: &CallContext, request: HistoryRequest) -> Result<Vec<HistoryBucket>, QueryError> {
        let query = resolve_history_query(request, now_unix())?;

        let buckets = ctx.run(self.store.get_history(&query)).await??;
        if buckets.is_empty() {
            info!(
                symbol = %query.symbol,
                from = query.from,
                to = query.to,
                interval = %query.interval,
                "No price history found"
            );
            return Err(QueryError::NotFound { symbol: query.symbol });
        }

        Ok(buckets)
    }
}

fn required_symbol(symbol: &str) -> Result<String, QueryError> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(QueryError::Invalid("symbol is required".to_string()));
    }
    Ok(symbol)
}

/// Fill in defaults: `to = now`, `from = to - 24h`, `interval = 1h`. Zero
/// bounds count as absent. The range is not checked for `from <= to`. The
/// default `from` saturates at `i64::MIN`.
pub fn resolve_history_query(request: HistoryRequest, now: i64) -> Result<HistoryQuery, QueryError> {
    let symbol = required_symbol(&request.symbol)?;

    let interval = match request.interval.as_deref().map(str::trim) {
        None | Some("") => Interval::default(),
        Some(raw) => raw
            .parse::<Interval>()
            .map_err(|e| QueryError::Invalid(format!("invalid interval: {}", e)))?,
    };

    let to = request.to.filter(|&t| t != 0).unwrap_or(now);
    let from = request.from.filter(|&f| f != 0).unwrap_or(to.saturating_sub(SECONDS_PER_DAY));

    Ok(HistoryQuery {
        symbol,
        interval,
        from,
        to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(symbol: &str) -> HistoryRequest {
        HistoryRequest {
            symbol: symbol.to_string(),
            ..HistoryRequest::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let query = resolve_history_query(request(" BTC "), 1_000_000).unwrap();
        assert_eq!(query.symbol, "btc");
        assert_eq!(query.interval, Interval::ONE_HOUR);
        assert_eq!(query.to, 1_000_000);
        assert_eq!(query.from, 1_000_000 - SECONDS_PER_DAY);
    }

    #[test]
    fn test_zero_bounds_are_absent() {
        let query = resolve_history_query(
            HistoryRequest {
                from: Some(0),
                to: Some(0),
                interval: Some("".to_string()),
                ..request("eth")
            },
            500_000,
        )
        .unwrap();
        assert_eq!(query.to, 500_000);
        assert_eq!(query.from, 500_000 - SECONDS_PER_DAY);
        assert_eq!(query.interval, Interval::ONE_HOUR);
    }

    #[test]
    fn test_explicit_values_kept() {
        let query = resolve_history_query(
            HistoryRequest {
                interval: Some("15m".to_string()),
                from: Some(100),
                to: Some(50),
                ..request("sol")
            },
            999,
        )
        .unwrap();
        assert_eq!(query.interval.seconds(), 900);
        assert_eq!((query.from, query.to), (100, 50));
    }

    #[test]
    fn test_default_from_saturates_at_min_time() {
        let query = resolve_history_query(
            HistoryRequest {
                to: Some(i64::MIN),
                ..request("btc")
            },
            1,
        )
        .unwrap();
        assert_eq!(query.to, i64::MIN);
        assert_eq!(query.from, i64::MIN);

        let query = resolve_history_query(
            HistoryRequest {
                to: Some(i64::MIN + 100),
                ..request("btc")
            },
            1,
        )
        .unwrap();
        assert_eq!(query.from, i64::MIN);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(resolve_history_query(request("  "), 1), Err(QueryError::Invalid(_))));
        assert!(matches!(
            resolve_history_query(
                HistoryRequest {
                    interval: Some("fortnight".to_string()),
                    ..request("btc")
                },
                1
            ),
            Err(QueryError::Invalid(_))
        ));
    }
}
