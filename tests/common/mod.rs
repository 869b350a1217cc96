//! Test doubles shared by the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use price_tracker::database::{MemoryPriceStore, PriceStore, StoreError};
use price_tracker::models::{Batch, HistoryBucket, HistoryQuery, PricePoint};
use price_tracker::services::{FetchError, PriceGateway};
use price_tracker::utils::CallContext;

pub fn point(symbol: &str, price: &str, time: i64) -> PricePoint {
    PricePoint::new(symbol, BigDecimal::from_str(price).unwrap(), time)
}

pub fn batch() -> Batch {
    vec![
        point("btc", "67000.5", 1_714_564_800),
        point("eth", "3100", 1_714_564_800),
        point("sol", "150.25", 1_714_564_800),
    ]
}

/// Gateway that replays a fixed script of outcomes, one per call.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<Batch, FetchError>>>,
    calls: AtomicU32,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Result<Batch, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceGateway for ScriptedGateway {
    async fn fetch(&self, _ctx: &CallContext, _page: u32, _limit: u32) -> Result<Batch, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::unexpected(None, "script exhausted")))
    }
}

/// Memory store that counts batch writes and can be told to fail them.
pub struct RecordingStore {
    inner: MemoryPriceStore,
    inserts: AtomicU32,
    fail_inserts: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryPriceStore::new(),
            inserts: AtomicU32::new(0),
            fail_inserts: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::new()
        }
    }

    pub fn inserts(&self) -> u32 {
        self.inserts.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl PriceStore for RecordingStore {
    async fn batch_insert(&self, points: &[PricePoint]) -> Result<u64, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.batch_insert(points).await
    }

    async fn get_latest(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError> {
        self.inner.get_latest(symbol).await
    }

    async fn get_price_at_or_before(&self, symbol: &str, at: i64) -> Result<Option<BigDecimal>, StoreError> {
        self.inner.get_price_at_or_before(symbol, at).await
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryBucket>, StoreError> {
        self.inner.get_history(query).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
