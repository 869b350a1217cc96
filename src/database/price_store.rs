use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Signed;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info};

use crate::models::{HistoryBucket, HistoryQuery, PricePoint};

/// Rows per multi-row INSERT. Three binds per row keeps each statement well
/// under the PostgreSQL parameter limit.
const INSERT_CHUNK_ROWS: usize = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid price point: {0}")]
    InvalidPoint(String),
}

/// Append-only price time series.
///
/// Absence is reported as `None` or an empty `Vec`, never as an error.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Append every point or none of them. Returns the number of rows written.
    async fn batch_insert(&self, points: &[PricePoint]) -> Result<u64, StoreError>;

    /// The point with the greatest `time` for `symbol`.
    async fn get_latest(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError>;

    /// Price of the point with the greatest `time <= at`.
    async fn get_price_at_or_before(&self, symbol: &str, at: i64) -> Result<Option<BigDecimal>, StoreError>;

    /// Buckets over `from <= time <= to`, ascending by bucket start.
    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryBucket>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Reject the whole batch if any point would violate the table constraints.
pub(crate) fn validate_batch(points: &[PricePoint]) -> Result<(), StoreError> {
    for point in points {
        if point.symbol.trim().is_empty() {
            return Err(StoreError::InvalidPoint(format!("empty symbol at time {}", point.time)));
        }
        if point.price.is_negative() {
            return Err(StoreError::InvalidPoint(format!(
                "negative price {} for {}",
                point.price, point.symbol
            )));
        }
    }
    Ok(())
}

/// PostgreSQL-backed store over the `coin_prices` table.
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn batch_insert(&self, points: &[PricePoint]) -> Result<u64, StoreError> {
        if points.is_empty() {
            return Ok(0);
        }
        validate_batch(points)?;

        debug!(count = points.len(), "Bulk inserting price points");

        // Dropping the transaction without commit rolls it back.
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for chunk in points.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO coin_prices (symbol, price, time) ");

            query_builder.push_values(chunk, |mut b, point| {
                b.push_bind(&point.symbol)
                    .push_bind(&point.price)
                    .push_bind(point.time);
            });

            let result = query_builder.build().execute(&mut *tx).await.map_err(|e| {
                error!("Failed to bulk insert price points: {}", e);
                e
            })?;
            written += result.rows_affected();
        }

        tx.commit().await?;

        info!(count = written, "Price points stored");
        Ok(written)
    }

    async fn get_latest(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError> {
        let point = sqlx::query_as::<_, PricePoint>(
            "SELECT symbol, price, time FROM coin_prices
             WHERE symbol = $1
             ORDER BY time DESC, id DESC
             LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(point)
    }

    async fn get_price_at_or_before(&self, symbol: &str, at: i64) -> Result<Option<BigDecimal>, StoreError> {
        let price = sqlx::query_scalar::<_, BigDecimal>(
            "SELECT price FROM coin_prices
             WHERE symbol = $1 AND time <= $2
             ORDER BY time DESC, id DESC
             LIMIT 1",
        )
        .bind(symbol)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price)
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryBucket>, StoreError> {
        // Floor-aligned buckets that stay correct for negative times.
        let buckets = sqlx::query_as::<_, HistoryBucket>(
            "SELECT bucket_start,
                    symbol,
                    AVG(price) AS avg_price,
                    (ARRAY_AGG(price ORDER BY time DESC, id DESC))[1] AS last_price
             FROM (
                 SELECT id, symbol, price, time,
                        time - (((time % $1) + $1) % $1) AS bucket_start
                 FROM coin_prices
                 WHERE symbol = $2 AND time >= $3 AND time <= $4
             ) points
             GROUP BY bucket_start, symbol
             ORDER BY bucket_start ASC",
        )
        .bind(query.interval.seconds())
        .bind(&query.symbol)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(buckets)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
