use super::snapshot::{BlockSource, DomainSetSnapshot};
use arc_swap::ArcSwap;
use gloryhole_application::ports::BlocklistFeeder;
use gloryhole_domain::DomainError;
use std::sync::Arc;
use tracing::info;

/// The blocklist: an atomically swapped immutable snapshot. Readers load
/// the pointer once per query; `reload` rebuilds from the feeder and
/// publishes, never blocking readers.
pub struct BlocklistSet {
    snapshot: ArcSwap<DomainSetSnapshot>,
    feeder: Option<Arc<dyn BlocklistFeeder>>,
}

impl BlocklistSet {
    pub fn new(snapshot: DomainSetSnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            feeder: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(DomainSetSnapshot::empty())
    }

    pub fn with_feeder(mut self, feeder: Arc<dyn BlocklistFeeder>) -> Self {
        self.feeder = Some(feeder);
        self
    }

    /// Returns the match source, or `None` when the domain is clean.
    #[inline]
    pub fn is_blocked(&self, domain: &str) -> Option<BlockSource> {
        self.snapshot.load().lookup(domain)
    }

    pub fn set_snapshot(&self, snapshot: DomainSetSnapshot) {
        let size = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));
        info!(size, "Blocklist snapshot published");
    }

    /// Replace only the pattern matcher, keeping the published exact set.
    /// Literal patterns fold into the exact set as usual.
    pub fn set_patterns(&self, patterns: &[String]) -> Result<(), DomainError> {
        let current = self.snapshot.load_full();
        let merged = DomainSetSnapshot::compile_with_exact_of(&current, patterns)?;
        self.set_snapshot(merged);
        Ok(())
    }

    /// Rebuild from the feeder and publish.
    pub async fn reload(&self) -> Result<usize, DomainError> {
        let feeder = self
            .feeder
            .as_ref()
            .ok_or_else(|| DomainError::IoError("no blocklist feeder configured".into()))?;
        let payload = feeder.load().await?;
        let snapshot = DomainSetSnapshot::compile(&payload.domains, &payload.patterns)?;
        let size = snapshot.len();
        self.set_snapshot(snapshot);
        Ok(size)
    }

    pub fn size(&self) -> usize {
        self.snapshot.load().len()
    }
}

/// Whitelist: suppresses blocklist matches only (never policy BLOCKs).
/// Same snapshot machinery as the blocklist.
pub struct Whitelist {
    snapshot: ArcSwap<DomainSetSnapshot>,
}

impl Whitelist {
    pub fn new(snapshot: DomainSetSnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn empty() -> Self {
        Self::new(DomainSetSnapshot::empty())
    }

    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        self.snapshot.load().contains(domain)
    }

    pub fn set_snapshot(&self, snapshot: DomainSetSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    pub fn size(&self) -> usize {
        self.snapshot.load().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gloryhole_application::ports::BlocklistPayload;

    struct StaticFeeder {
        payload: BlocklistPayload,
    }

    #[async_trait]
    impl BlocklistFeeder for StaticFeeder {
        async fn load(&self) -> Result<BlocklistPayload, DomainError> {
            Ok(self.payload.clone())
        }
    }

    #[test]
    fn empty_blocklist_allows_everything() {
        let set = BlocklistSet::empty();
        assert!(set.is_blocked("ads.example.com").is_none());
        assert_eq!(set.size(), 0);
    }

    #[test]
    fn snapshot_swap_is_visible() {
        let set = BlocklistSet::empty();
        set.set_snapshot(
            DomainSetSnapshot::compile(&["ads.example.com".into()], &[]).unwrap(),
        );
        assert_eq!(set.is_blocked("ads.example.com"), Some(BlockSource::Exact));

        set.set_snapshot(DomainSetSnapshot::empty());
        assert!(set.is_blocked("ads.example.com").is_none());
    }

    #[test]
    fn set_patterns_keeps_exact_entries() {
        let set = BlocklistSet::new(
            DomainSetSnapshot::compile(&["tracker.example".into()], &[]).unwrap(),
        );
        set.set_patterns(&["*.ads.example".into()]).unwrap();
        assert_eq!(set.is_blocked("tracker.example"), Some(BlockSource::Exact));
        assert_eq!(
            set.is_blocked("x.ads.example"),
            Some(BlockSource::Wildcard)
        );
    }

    #[tokio::test]
    async fn reload_pulls_from_feeder() {
        let feeder = Arc::new(StaticFeeder {
            payload: BlocklistPayload {
                domains: vec!["bad.example".into()],
                patterns: vec!["*.ads.example".into()],
            },
        });
        let set = BlocklistSet::empty().with_feeder(feeder);
        let size = set.reload().await.unwrap();
        assert_eq!(size, 2);
        assert!(set.is_blocked("bad.example").is_some());
    }

    #[tokio::test]
    async fn reload_without_feeder_errors() {
        let set = BlocklistSet::empty();
        assert!(set.reload().await.is_err());
    }
}
