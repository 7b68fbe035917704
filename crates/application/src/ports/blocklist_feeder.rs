use async_trait::async_trait;
use gloryhole_domain::DomainError;

/// Parsed blocklist material, ready for compilation. The core never sees
/// source URLs or file formats.
#[derive(Debug, Clone, Default)]
pub struct BlocklistPayload {
    /// Exact domains.
    pub domains: Vec<String>,
    /// Wildcard / regex / literal patterns.
    pub patterns: Vec<String>,
}

/// Supplies blocklist material on demand; `BlocklistSet::reload` pulls from
/// it and publishes a fresh snapshot.
#[async_trait]
pub trait BlocklistFeeder: Send + Sync {
    async fn load(&self) -> Result<BlocklistPayload, DomainError>;
}
