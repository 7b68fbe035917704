//! Glory-Hole Application Layer
//!
//! Ports (traits) for the external collaborators the query-processing core
//! talks to, plus the use cases shared by the jobs crate.
pub mod ports;
pub mod use_cases;
