use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gloryhole_application::ports::{QueryLogFilter, QueryLogStore, StoredDecision};
use gloryhole_domain::{DomainError, QueryDecision};
use tokio::sync::Mutex;

/// In-memory stand-in for the SQLite store, tracking only what retention
/// needs: per-record timestamps.
pub struct MockQueryLogStore {
    records: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl MockQueryLogStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub async fn add_recent_log(&self, client: &str) {
        self.records
            .lock()
            .await
            .push((client.to_string(), Utc::now()));
    }

    pub async fn add_old_log(&self, client: &str, age_days: i64) {
        self.records
            .lock()
            .await
            .push((client.to_string(), Utc::now() - Duration::days(age_days)));
    }

    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }
}

impl Default for MockQueryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryLogStore for MockQueryLogStore {
    async fn insert_batch(&self, records: &[QueryDecision]) -> Result<(), DomainError> {
        let mut store = self.records.lock().await;
        for record in records {
            store.push((record.client_ip.to_string(), Utc::now()));
        }
        Ok(())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut store = self.records.lock().await;
        let before = store.len();
        store.retain(|(_, ts)| *ts >= cutoff);
        Ok((before - store.len()) as u64)
    }

    async fn query_range(
        &self,
        _filter: &QueryLogFilter,
    ) -> Result<Vec<StoredDecision>, DomainError> {
        Ok(Vec::new())
    }
}
