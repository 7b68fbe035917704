use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Blocklist and whitelist seeds. Inline lists are always loaded; files are
/// newline-delimited domains or patterns (hosts-file lines tolerated).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Exact domains to block.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Wildcard (`*.ads.example`) or regex patterns to block.
    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub domain_files: Vec<PathBuf>,

    #[serde(default)]
    pub pattern_files: Vec<PathBuf>,

    /// Whitelist overrides: suppress blocklist matches only.
    #[serde(default)]
    pub whitelist_domains: Vec<String>,

    #[serde(default)]
    pub whitelist_patterns: Vec<String>,

    #[serde(default)]
    pub whitelist_files: Vec<PathBuf>,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domains: vec![],
            patterns: vec![],
            domain_files: vec![],
            pattern_files: vec![],
            whitelist_domains: vec![],
            whitelist_patterns: vec![],
            whitelist_files: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
