use crate::ports::QueryLogStore;
use chrono::{Duration, Utc};
use gloryhole_domain::DomainError;
use std::sync::Arc;
use tracing::debug;

/// Deletes query log records older than a retention window.
pub struct CleanupOldQueryLogsUseCase {
    store: Arc<dyn QueryLogStore>,
}

impl CleanupOldQueryLogsUseCase {
    pub fn new(store: Arc<dyn QueryLogStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, retention_days: u32) -> Result<u64, DomainError> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let deleted = self.store.delete_before(cutoff).await?;
        debug!(retention_days, deleted, "Query log cleanup executed");
        Ok(deleted)
    }
}
