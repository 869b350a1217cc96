pub mod ingestion_service;
pub mod metrics;
pub mod price_gateway;
pub mod query_service;
pub mod scheduler;

pub use ingestion_service::*;
pub use metrics::IngestionMetrics;
pub use price_gateway::*;
pub use query_service::*;
pub use scheduler::IngestionScheduler;
