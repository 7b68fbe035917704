//! Configuration for Glory-Hole, organized by area:
//! - `root`: top-level `Config`, file loading and CLI overrides
//! - `server`: listener binding and request deadlines
//! - `cache`: response cache sizing and TTL bounds
//! - `rate_limit`: per-client token buckets
//! - `forwarder`: default upstream pool and conditional forwarding rules
//! - `storage`: query log persistence and retention
//! - `blocking`: blocklist/whitelist seeds and source files
//! - `local`: local DNS records

pub mod blocking;
pub mod cache;
pub mod errors;
pub mod forwarder;
pub mod local;
pub mod rate_limit;
pub mod root;
pub mod server;
pub mod storage;

pub use blocking::BlockingConfig;
pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use forwarder::ForwarderConfig;
pub use local::{LocalConfig, LocalRecordConfig};
pub use rate_limit::{RateLimitAction, RateLimitConfig};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use storage::StorageConfig;
