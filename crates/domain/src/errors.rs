use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid local record for '{domain}': {reason}")]
    InvalidLocalRecord { domain: String, reason: String },

    #[error("Policy rule '{rule}' failed to compile: {reason}")]
    PolicyCompile { rule: String, reason: String },

    #[error("Policy rule not found: {0}")]
    PolicyRuleNotFound(String),

    #[error("Duplicate policy rule: {0}")]
    DuplicatePolicyRule(String),

    #[error("Invalid forwarding rule '{rule}': {reason}")]
    InvalidForwardingRule { rule: String, reason: String },

    #[error("Invalid upstream endpoint: {0}")]
    InvalidUpstream(String),

    #[error("All upstream servers failed: {0}")]
    UpstreamUnavailable(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Malformed DNS message: {0}")]
    MalformedMessage(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
