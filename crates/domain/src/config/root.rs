use super::{
    BlockingConfig, CacheConfig, ConfigError, ForwarderConfig, LocalConfig, RateLimitConfig,
    ServerConfig, StorageConfig,
};
use crate::policy::PolicyRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration. Every section has full defaults, so an empty
/// file (or no file) yields a working resolver.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub forwarder: ForwarderConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub local: LocalConfig,

    /// Seed policy rules, evaluated in declaration order.
    #[serde(default, rename = "policy")]
    pub policies: Vec<PolicyRule>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match &overrides.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: &CliOverrides) {
        if let Some(listen) = &overrides.listen {
            self.server.listen_address = listen.clone();
        }
        if let Some(database) = &overrides.database {
            self.storage.database_url = database.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.udp_enabled && !self.server.tcp_enabled {
            return Err(ConfigError::Invalid(
                "both udp and tcp listeners are disabled".into(),
            ));
        }
        if self.cache.min_ttl > self.cache.max_ttl {
            return Err(ConfigError::Invalid(format!(
                "cache.min_ttl ({}) exceeds cache.max_ttl ({})",
                self.cache.min_ttl, self.cache.max_ttl
            )));
        }
        if self.forwarder.default_upstreams.is_empty() {
            return Err(ConfigError::Invalid(
                "forwarder.default_upstreams is empty".into(),
            ));
        }
        for rule in &self.forwarder.rules {
            rule.validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }
}

/// Flags the binary passes down; anything set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub listen: Option<String>,
    pub database: Option<String>,
    pub log_level: Option<String>,
}
