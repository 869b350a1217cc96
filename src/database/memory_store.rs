use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::price_store::{validate_batch, PriceStore, StoreError};
use crate::models::{HistoryBucket, HistoryQuery, PricePoint};
use crate::utils::math::mean;

/// In-process store for development and tests.
///
/// Points are kept per symbol in insertion order, so "most recently inserted"
/// is simply the later index.
#[derive(Default)]
pub struct MemoryPriceStore {
    series: RwLock<HashMap<String, Vec<PricePoint>>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.series.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Last point by time among `points`, preferring the later one on equal times.
fn latest_of<'a, I>(points: I) -> Option<&'a PricePoint>
where
    I: IntoIterator<Item = &'a PricePoint>,
{
    points.into_iter().fold(None, |best, point| match best {
        Some(current) if current.time > point.time => Some(current),
        _ => Some(point),
    })
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn batch_insert(&self, points: &[PricePoint]) -> Result<u64, StoreError> {
        if points.is_empty() {
            return Ok(0);
        }
        validate_batch(points)?;

        let mut series = self.series.write().await;
        for point in points {
            series.entry(point.symbol.clone()).or_default().push(point.clone());
        }

        debug!(count = points.len(), "Price points stored in memory");
        Ok(points.len() as u64)
    }

    async fn get_latest(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError> {
        let series = self.series.read().await;
        Ok(series.get(symbol).and_then(|points| latest_of(points)).cloned())
    }

    async fn get_price_at_or_before(&self, symbol: &str, at: i64) -> Result<Option<BigDecimal>, StoreError> {
        let series = self.series.read().await;
        Ok(series
            .get(symbol)
            .and_then(|points| latest_of(points.iter().filter(|p| p.time <= at)))
            .map(|p| p.price.clone()))
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryBucket>, StoreError> {
        let series = self.series.read().await;
        let Some(points) = series.get(&query.symbol) else {
            return Ok(Vec::new());
        };

        let mut grouped: BTreeMap<i64, Vec<&PricePoint>> = BTreeMap::new();
        for point in points.iter().filter(|p| p.time >= query.from && p.time <= query.to) {
            grouped
                .entry(query.interval.bucket_start(point.time))
                .or_default()
                .push(point);
        }

        let buckets = grouped
            .into_iter()
            .filter_map(|(bucket_start, members)| {
                let avg_price = mean(members.iter().map(|p| &p.price))?;
                let last_price = latest_of(members.iter().copied())?.price.clone();
                Some(HistoryBucket {
                    bucket_start,
                    symbol: query.symbol.clone(),
                    avg_price,
                    last_price,
                })
            })
            .collect();

        Ok(buckets)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
