//! Glory-Hole Infrastructure Layer
//!
//! Concrete implementations of the query-processing core: filtering engines,
//! the response cache, the policy engine, forwarding, the request pipeline
//! and the persistent query log.
pub mod database;
pub mod dns;
pub mod metrics;
pub mod repositories;
