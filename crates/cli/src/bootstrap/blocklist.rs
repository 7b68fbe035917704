use async_trait::async_trait;
use gloryhole_application::ports::{BlocklistFeeder, BlocklistPayload};
use gloryhole_domain::config::BlockingConfig;
use gloryhole_domain::DomainError;
use gloryhole_infrastructure::dns::blocklist::patterns::{classify, PatternClass};
use std::path::Path;
use tracing::{info, warn};

/// Blocklist feeder reading inline config lists plus local files.
/// Files are newline-delimited; comments (`#`, `!`) and hosts-file lines
/// (`0.0.0.0 ads.example`) are tolerated. No network fetching here.
pub struct FileBlocklistFeeder {
    config: BlockingConfig,
}

impl FileBlocklistFeeder {
    pub fn new(config: BlockingConfig) -> Self {
        Self { config }
    }

    /// Whitelist material, split into exact domains and patterns.
    pub async fn load_whitelist(&self) -> Result<BlocklistPayload, DomainError> {
        let mut domains = self.config.whitelist_domains.clone();
        let mut patterns = self.config.whitelist_patterns.clone();

        for path in &self.config.whitelist_files {
            for entry in read_list_file(path).await? {
                match classify(&entry) {
                    PatternClass::Literal => domains.push(entry),
                    _ => patterns.push(entry),
                }
            }
        }

        Ok(BlocklistPayload { domains, patterns })
    }
}

#[async_trait]
impl BlocklistFeeder for FileBlocklistFeeder {
    async fn load(&self) -> Result<BlocklistPayload, DomainError> {
        let mut domains = self.config.domains.clone();
        let mut patterns = self.config.patterns.clone();

        for path in &self.config.domain_files {
            let entries = read_list_file(path).await?;
            info!(path = %path.display(), entries = entries.len(), "Blocklist file loaded");
            domains.extend(entries);
        }
        for path in &self.config.pattern_files {
            let entries = read_list_file(path).await?;
            info!(path = %path.display(), entries = entries.len(), "Pattern file loaded");
            patterns.extend(entries);
        }

        Ok(BlocklistPayload { domains, patterns })
    }
}

async fn read_list_file(path: &Path) -> Result<Vec<String>, DomainError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read list file");
        DomainError::IoError(format!("'{}': {e}", path.display()))
    })?;
    Ok(raw.lines().filter_map(parse_list_line).collect())
}

/// One list line → one domain/pattern, or nothing for comments and blanks.
/// Hosts-file lines keep their last field.
fn parse_list_line(line: &str) -> Option<String> {
    let line = line.split(['#', '!']).next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }

    let mut fields = line.split_whitespace();
    let first = fields.next()?;
    match fields.next_back() {
        Some(last) if first.parse::<std::net::IpAddr>().is_ok() => Some(last.to_string()),
        Some(_) => None,
        None => Some(first.to_string()),
    }
}
