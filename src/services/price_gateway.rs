use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Signed;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::ProviderSettings;
use crate::error::{AppError, Retryable};
use crate::models::{normalize_symbol, Batch, PricePoint};
use crate::utils::time::{now_unix, parse_rfc3339_unix};
use crate::utils::{CallContext, Interrupted};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Classified outcome of a failed provider call.
///
/// Classification is structural: it comes from the HTTP status and the shape
/// of the decoded body, never from matching on error text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The provider signalled backpressure (HTTP 429). Never retried locally.
    #[error("rate limited by price provider")]
    RateLimited,

    /// The provider answered successfully but with no usable entries.
    #[error("price provider returned no usable entries")]
    EmptyResult,

    /// Any other non-success status, transport failure or undecodable body.
    #[error("unexpected price provider response{}: {reason}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Unexpected { status: Option<u16>, reason: String },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl FetchError {
    pub fn unexpected(status: Option<u16>, reason: impl Into<String>) -> Self {
        FetchError::Unexpected {
            status,
            reason: reason.into(),
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited => "rate_limited",
            FetchError::EmptyResult => "empty_result",
            FetchError::Unexpected { .. } => "unexpected",
            FetchError::Interrupted(Interrupted::Canceled) => "canceled",
            FetchError::Interrupted(Interrupted::DeadlineExceeded) => "deadline_exceeded",
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::EmptyResult | FetchError::Unexpected { .. } => true,
            FetchError::RateLimited | FetchError::Interrupted(_) => false,
        }
    }
}

/// Source of current price snapshots, one page at a time.
#[async_trait]
pub trait PriceGateway: Send + Sync {
    /// Fetch one page of current prices. `page` and `limit` start at 1.
    async fn fetch(&self, ctx: &CallContext, page: u32, limit: u32) -> Result<Batch, FetchError>;
}

/// One entry of the `/coins/markets` listing. Only the fields we store.
#[derive(Debug, Deserialize)]
struct CoinMarketEntry {
    symbol: Option<String>,
    current_price: Option<serde_json::Number>,
    last_updated: Option<String>,
}

/// CoinGecko-compatible `/coins/markets` client.
pub struct CoinGeckoGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    vs_currency: String,
}

impl CoinGeckoGateway {
    pub fn new(settings: &ProviderSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("price-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|e| AppError::ConfigError(format!("Invalid provider base URL '{}': {}", settings.base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
            vs_currency: settings.vs_currency.clone(),
        })
    }

    fn markets_url(&self, page: u32, limit: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            let path = format!("{}/coins/markets", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("vs_currency", &self.vs_currency)
            .append_pair("order", "market_cap_desc")
            .append_pair("per_page", &limit.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("sparkline", "false");
        url
    }
}

#[async_trait]
impl PriceGateway for CoinGeckoGateway {
    async fn fetch(&self, ctx: &CallContext, page: u32, limit: u32) -> Result<Batch, FetchError> {
        if page == 0 || limit == 0 {
            return Err(FetchError::unexpected(None, "page and limit must be at least 1"));
        }

        let url = self.markets_url(page, limit);
        info!(url = %url, page, limit, "Fetching prices from provider");

        let mut request = self.client.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = ctx
            .run(request.send())
            .await?
            .map_err(|e| FetchError::unexpected(None, format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(status = status.as_u16(), "Price provider rate limit exceeded");
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Price provider returned unexpected status");
            return Err(FetchError::unexpected(Some(status.as_u16()), "non-success status"));
        }

        let body = ctx
            .run(response.text())
            .await?
            .map_err(|e| FetchError::unexpected(Some(status.as_u16()), format!("failed to read body: {}", e)))?;

        let entries: Vec<CoinMarketEntry> = serde_json::from_str(&body)
            .map_err(|e| FetchError::unexpected(Some(status.as_u16()), format!("failed to decode body: {}", e)))?;

        let points = to_price_points(entries, now_unix());
        if points.is_empty() {
            warn!(page, limit, "No prices returned from provider");
            return Err(FetchError::EmptyResult);
        }

        info!(count = points.len(), "Fetched prices successfully");
        Ok(points)
    }
}

/// Turn decoded entries into price points observed at `observed_at`.
///
/// Entries without a symbol or with a missing/negative price are skipped. An
/// unparseable freshness timestamp falls back to `observed_at`.
fn to_price_points(entries: Vec<CoinMarketEntry>, observed_at: i64) -> Batch {
    let mut points = Vec::with_capacity(entries.len());

    for entry in entries {
        let symbol = match entry.symbol.as_deref().map(normalize_symbol) {
            Some(symbol) if !symbol.is_empty() => symbol,
            _ => {
                warn!("Skipping provider entry without symbol");
                continue;
            }
        };

        let price = match entry
            .current_price
            .as_ref()
            .and_then(|n| BigDecimal::from_str(&n.to_string()).ok())
        {
            Some(price) if !price.is_negative() => price,
            _ => {
                warn!(symbol = %symbol, "Skipping provider entry with missing or invalid price");
                continue;
            }
        };

        let time = match entry.last_updated.as_deref().and_then(parse_rfc3339_unix) {
            Some(time) => time,
            None => {
                warn!(
                    symbol = %symbol,
                    last_updated = entry.last_updated.as_deref().unwrap_or(""),
                    "Invalid last_updated format, using observation time"
                );
                observed_at
            }
        };

        points.push(PricePoint::new(&symbol, price, time));
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(json: &str) -> Vec<CoinMarketEntry> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_to_price_points_parses_entries() {
        let points = to_price_points(
            entries(
                r#"[
                    {"symbol": "BTC", "current_price": 67123.45, "last_updated": "2024-05-01T12:00:00.000Z"},
                    {"symbol": "eth", "current_price": 3100, "last_updated": "2024-05-01T12:00:30Z"}
                ]"#,
            ),
            1,
        );

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].symbol, "btc");
        assert_eq!(points[0].price, BigDecimal::from_str("67123.45").unwrap());
        assert_eq!(points[0].time, 1_714_564_800);
        assert_eq!(points[1].price, BigDecimal::from(3100));
        assert_eq!(points[1].time, 1_714_564_830);
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_observation_time() {
        let points = to_price_points(
            entries(r#"[{"symbol": "sol", "current_price": 150.5, "last_updated": "not a time"}]"#),
            1_700_000_000,
        );
        assert_eq!(points[0].time, 1_700_000_000);

        let points = to_price_points(entries(r#"[{"symbol": "sol", "current_price": 150.5}]"#), 42);
        assert_eq!(points[0].time, 42);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let points = to_price_points(
            entries(
                r#"[
                    {"symbol": "", "current_price": 1.0},
                    {"current_price": 1.0},
                    {"symbol": "dead", "current_price": null},
                    {"symbol": "neg", "current_price": -3.0},
                    {"symbol": "ok", "current_price": 0}
                ]"#,
            ),
            7,
        );
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].symbol, "ok");
    }

    #[test]
    fn test_retry_classification() {
        assert!(FetchError::EmptyResult.is_retryable());
        assert!(FetchError::unexpected(Some(500), "boom").is_retryable());
        assert!(!FetchError::RateLimited.is_retryable());
        assert!(!FetchError::Interrupted(Interrupted::Canceled).is_retryable());
    }

    #[test]
    fn test_unexpected_display_includes_status() {
        let err = FetchError::unexpected(Some(503), "non-success status");
        assert_eq!(err.to_string(), "unexpected price provider response (status 503): non-success status");

        let err = FetchError::unexpected(None, "request failed");
        assert_eq!(err.to_string(), "unexpected price provider response: request failed");
    }

    #[test]
    fn test_markets_url() {
        let gateway = CoinGeckoGateway::new(&ProviderSettings {
            base_url: "http://localhost:9999/api/v3/".to_string(),
            ..ProviderSettings::default()
        })
        .unwrap();

        let url = gateway.markets_url(2, 50);
        assert_eq!(url.path(), "/api/v3/coins/markets");
        let query = url.query().unwrap();
        assert!(query.contains("vs_currency=usd"));
        assert!(query.contains("per_page=50"));
        assert!(query.contains("page=2"));
    }
}
