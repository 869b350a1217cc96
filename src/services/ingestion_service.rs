use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::IngestionSettings;
use crate::database::{PriceStore, StoreError};
use crate::error::{RetryDecision, RetryFailure, RetryPolicy, RetryState};
use crate::models::Batch;
use crate::services::metrics::IngestionMetrics;
use crate::services::price_gateway::{FetchError, PriceGateway};
use crate::utils::{CallContext, Interrupted};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("price provider rate limited the request on attempt {attempt}")]
    RateLimited { attempt: u32 },

    #[error("price provider unavailable after {attempts} attempt(s): {last}")]
    UpstreamUnavailable { attempts: u32, last: FetchError },

    #[error("failed to persist {points} price point(s): {source}")]
    PersistFailure {
        points: usize,
        #[source]
        source: StoreError,
    },

    #[error("ingestion canceled")]
    Canceled,

    #[error("ingestion deadline exceeded")]
    DeadlineExceeded,
}

impl IngestError {
    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            IngestError::RateLimited { .. } => "rate_limited",
            IngestError::UpstreamUnavailable { .. } => "upstream_unavailable",
            IngestError::PersistFailure { .. } => "persist_failure",
            IngestError::Canceled => "canceled",
            IngestError::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl From<Interrupted> for IngestError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Canceled => IngestError::Canceled,
            Interrupted::DeadlineExceeded => IngestError::DeadlineExceeded,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Provider calls made, including the successful one.
    pub attempts: u32,
    /// Rows written by the single batch insert.
    pub points: u64,
}

/// Fetch one page of prices with bounded retry, then persist it as one batch.
///
/// Stateless per run; share it behind an `Arc` and call [`run`](Self::run)
/// from as many triggers as needed.
pub struct IngestionPipeline {
    gateway: Arc<dyn PriceGateway>,
    store: Arc<dyn PriceStore>,
    metrics: IngestionMetrics,
    policy: RetryPolicy,
    page: u32,
    limit: u32,
}

impl IngestionPipeline {
    pub fn new(gateway: Arc<dyn PriceGateway>, store: Arc<dyn PriceStore>, metrics: IngestionMetrics) -> Self {
        let defaults = IngestionSettings::default();
        Self {
            gateway,
            store,
            metrics,
            policy: RetryPolicy::default(),
            page: defaults.page,
            limit: defaults.per_page,
        }
    }

    pub fn from_settings(
        gateway: Arc<dyn PriceGateway>,
        store: Arc<dyn PriceStore>,
        metrics: IngestionMetrics,
        settings: &IngestionSettings,
    ) -> Self {
        Self::new(gateway, store, metrics)
            .with_policy(RetryPolicy::from_settings(settings))
            .with_page(settings.page, settings.per_page)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn metrics(&self) -> &IngestionMetrics {
        &self.metrics
    }

    pub async fn run(&self, ctx: &CallContext) -> Result<IngestReport, IngestError> {
        let result = self.fetch_and_persist(ctx).await;

        match &result {
            Ok(report) => {
                self.metrics.record_run("success");
                self.metrics.record_points(report.points);
                info!(attempts = report.attempts, points = report.points, "Ingestion run completed");
            }
            Err(e) => {
                self.metrics.record_run(e.outcome());
                match e {
                    IngestError::Canceled | IngestError::DeadlineExceeded => {
                        warn!(outcome = e.outcome(), "Ingestion run interrupted")
                    }
                    _ => error!(outcome = e.outcome(), error = %e, "Ingestion run failed"),
                }
            }
        }

        result
    }

    async fn fetch_and_persist(&self, ctx: &CallContext) -> Result<IngestReport, IngestError> {
        let (batch, attempts) = self.fetch_with_retry(ctx).await?;
        let points = batch.len();

        let written = ctx
            .run(self.store.batch_insert(&batch))
            .await?
            .map_err(|source| IngestError::PersistFailure { points, source })?;

        Ok(IngestReport {
            attempts,
            points: written,
        })
    }

    async fn fetch_with_retry(&self, ctx: &CallContext) -> Result<(Batch, u32), IngestError> {
        let mut state = RetryState::new(self.policy.clone());

        loop {
            let attempt = state.attempt();
            ctx.check()?;
            self.metrics.record_attempt();

            let error = match ctx.run(self.gateway.fetch(ctx, self.page, self.limit)).await? {
                Ok(batch) => return Ok((batch, attempt)),
                Err(FetchError::Interrupted(interrupted)) => return Err(interrupted.into()),
                Err(error) => error,
            };

            let kind = error.kind();
            match state.on_failure(error) {
                RetryDecision::Retry { next_attempt, delay } => {
                    warn!(
                        attempt,
                        next_attempt,
                        error = kind,
                        delay_ms = delay.as_millis() as u64,
                        "Price fetch failed, retrying"
                    );
                    ctx.sleep(delay).await?;
                }
                RetryDecision::GiveUp(RetryFailure::Fatal { attempt, error }) => {
                    return Err(match error {
                        FetchError::RateLimited => IngestError::RateLimited { attempt },
                        other => IngestError::UpstreamUnavailable {
                            attempts: attempt,
                            last: other,
                        },
                    });
                }
                RetryDecision::GiveUp(RetryFailure::Exhausted { attempts, last }) => {
                    return Err(IngestError::UpstreamUnavailable { attempts, last });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_maps_to_matching_variant() {
        assert!(matches!(IngestError::from(Interrupted::Canceled), IngestError::Canceled));
        assert!(matches!(
            IngestError::from(Interrupted::DeadlineExceeded),
            IngestError::DeadlineExceeded
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = IngestError::UpstreamUnavailable {
            attempts: 3,
            last: FetchError::EmptyResult,
        };
        assert_eq!(
            err.to_string(),
            "price provider unavailable after 3 attempt(s): price provider returned no usable entries"
        );
        assert_eq!(err.outcome(), "upstream_unavailable");
    }
}
