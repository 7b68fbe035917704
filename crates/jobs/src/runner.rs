use crate::{CacheMaintenanceJob, QueryLogRetentionJob, RateLimitSweepJob};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for the background jobs.
///
/// Register jobs with the builder methods, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_retention(QueryLogRetentionJob::new(cleanup, 90))
///     .with_cache_maintenance(CacheMaintenanceJob::new(cache, 300))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    retention: Option<QueryLogRetentionJob>,
    cache_maintenance: Option<CacheMaintenanceJob>,
    rate_limit_sweep: Option<RateLimitSweepJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            retention: None,
            cache_maintenance: None,
            rate_limit_sweep: None,
        }
    }

    pub fn with_retention(mut self, job: QueryLogRetentionJob) -> Self {
        self.retention = Some(job);
        self
    }

    pub fn with_cache_maintenance(mut self, job: CacheMaintenanceJob) -> Self {
        self.cache_maintenance = Some(job);
        self
    }

    pub fn with_rate_limit_sweep(mut self, job: RateLimitSweepJob) -> Self {
        self.rate_limit_sweep = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.retention {
            Arc::new(job).start().await;
        }

        if let Some(job) = self.cache_maintenance {
            Arc::new(job).start().await;
        }

        if let Some(job) = self.rate_limit_sweep {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
