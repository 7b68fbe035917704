use gloryhole_domain::config::{CliOverrides, Config, ConfigError};
use tracing::info;

pub fn load(overrides: &CliOverrides) -> Result<Config, ConfigError> {
    let config = Config::load(overrides)?;
    match &overrides.config {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("No config file given, using defaults"),
    }
    Ok(config)
}
