use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::ingestion_service::IngestionPipeline;
use crate::utils::CallContext;

/// Periodic ingestion trigger.
///
/// Each tick runs the pipeline under a child of the shutdown token with its
/// own deadline. Failures are logged by the pipeline and never stop the loop.
pub struct IngestionScheduler {
    pipeline: Arc<IngestionPipeline>,
    period: Duration,
    run_timeout: Duration,
}

impl IngestionScheduler {
    pub fn new(pipeline: Arc<IngestionPipeline>, period: Duration, run_timeout: Duration) -> Self {
        Self {
            pipeline,
            period,
            run_timeout,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Tick until `shutdown` is cancelled. The first run starts immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            period_secs = self.period.as_secs(),
            run_timeout_secs = self.run_timeout.as_secs(),
            "Starting ingestion scheduler"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let root = CallContext::with_token(shutdown.clone());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let ctx = root.child().with_timeout(self.run_timeout);
                    debug!("Scheduled ingestion run starting");
                    // Outcome is logged and counted by the pipeline.
                    let _ = self.pipeline.run(&ctx).await;
                }
            }
        }

        info!("Ingestion scheduler stopped");
    }
}
