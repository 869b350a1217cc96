pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use error::types::*;

use std::sync::Arc;

use crate::config::Settings;
use crate::database::PriceStore;
use crate::handlers::ReadinessTracker;
use crate::services::{IngestionMetrics, IngestionPipeline, PriceGateway, QueryEngine};

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub query: Arc<QueryEngine>,
    pub settings: Arc<Settings>,
    pub readiness: Arc<ReadinessTracker>,
}

impl AppState {
    /// Wire the pipeline and query engine over one shared store.
    pub fn new(
        settings: Settings,
        store: Arc<dyn PriceStore>,
        gateway: Arc<dyn PriceGateway>,
    ) -> Result<Self, AppError> {
        let metrics = IngestionMetrics::new()?;
        let pipeline = IngestionPipeline::from_settings(gateway, store.clone(), metrics, &settings.ingestion);

        Ok(Self {
            query: Arc::new(QueryEngine::new(store.clone())),
            pipeline: Arc::new(pipeline),
            store,
            settings: Arc::new(settings),
            readiness: Arc::new(ReadinessTracker::new()),
        })
    }
}
