pub mod conditional;
pub mod endpoint;
pub mod forwarder;
pub mod transport;

pub use conditional::{CompiledForwardRule, ConditionalForwarder};
pub use endpoint::EndpointState;
pub use forwarder::{ForwardOutcome, UpstreamForwarder};
pub use transport::{NetExchanger, UpstreamExchanger};
