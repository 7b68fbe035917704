use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
