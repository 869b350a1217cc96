use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;

/// Counters for the ingestion pipeline, kept in a private registry.
#[derive(Clone)]
pub struct IngestionMetrics {
    registry: Registry,
    runs: IntCounterVec,
    fetch_attempts: IntCounter,
    points_ingested: IntCounter,
}

impl IngestionMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let runs = IntCounterVec::new(
            Opts::new("price_tracker_ingestion_runs_total", "Ingestion runs by outcome"),
            &["outcome"],
        )?;
        let fetch_attempts = IntCounter::new(
            "price_tracker_fetch_attempts_total",
            "Calls made to the price provider",
        )?;
        let points_ingested = IntCounter::new(
            "price_tracker_points_ingested_total",
            "Price points written to the store",
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(fetch_attempts.clone()))?;
        registry.register(Box::new(points_ingested.clone()))?;

        Ok(Self {
            registry,
            runs,
            fetch_attempts,
            points_ingested,
        })
    }

    pub fn record_attempt(&self) {
        self.fetch_attempts.inc();
    }

    pub fn record_run(&self, outcome: &str) {
        self.runs.with_label_values(&[outcome]).inc();
    }

    pub fn record_points(&self, count: u64) {
        self.points_ingested.inc_by(count);
    }

    pub fn run_count(&self, outcome: &str) -> u64 {
        self.runs.with_label_values(&[outcome]).get()
    }

    pub fn attempt_count(&self) -> u64 {
        self.fetch_attempts.get()
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::InternalError(format!("Metrics are not valid UTF-8: {}", e)))
    }
}
