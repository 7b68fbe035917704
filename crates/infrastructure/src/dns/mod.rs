pub mod answers;
pub mod blocklist;
pub mod cache;
pub mod forwarding;
pub mod handler;
pub mod kill_switch;
pub mod local_records;
pub mod policy;
pub mod query_log;
pub mod rate_limit;
pub mod server;

pub use handler::{HandlerResponse, QueryHandler, QueryHandlerBuilder};
pub use server::DnsServerHandler;
