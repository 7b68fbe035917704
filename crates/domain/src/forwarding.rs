use crate::errors::DomainError;
use crate::record_type::RecordType;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
        }
    }
}

/// One upstream DNS endpoint. Parsed from `1.1.1.1`, `1.1.1.1:53`,
/// `udp://9.9.9.9:53` or `tcp://10.0.0.1:5353`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamEndpoint {
    pub addr: SocketAddr,
    pub transport: Transport,
}

impl UpstreamEndpoint {
    pub fn new(addr: SocketAddr, transport: Transport) -> Self {
        Self { addr, transport }
    }

    pub fn parse_list(spec: &str) -> Result<Vec<Self>, DomainError> {
        spec.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for UpstreamEndpoint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (transport, rest) = match s.split_once("://") {
            Some(("udp", rest)) => (Transport::Udp, rest),
            Some(("tcp", rest)) => (Transport::Tcp, rest),
            Some((scheme, _)) => {
                return Err(DomainError::InvalidUpstream(format!(
                    "unsupported scheme '{scheme}' in '{s}'"
                )))
            }
            None => (Transport::Udp, s),
        };

        let addr = if rest.contains(':') && !rest.starts_with('[') && rest.matches(':').count() > 1 {
            // Bare IPv6 literal without a port.
            format!("[{rest}]:53").parse()
        } else if rest.parse::<std::net::IpAddr>().is_ok() {
            format!("{rest}:53").parse()
        } else {
            rest.parse()
        };

        addr.map(|addr| UpstreamEndpoint { addr, transport })
            .map_err(|e| DomainError::InvalidUpstream(format!("'{s}': {e}")))
    }
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport.as_str(), self.addr)
    }
}

/// A conditional forwarding rule. Each populated selector must match
/// (AND across selectors); within a selector any element may match (OR).
/// An absent selector is a wildcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub name: Arc<str>,
    /// Domain patterns: exact names, `*.suffix` wildcards or regexes.
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub client_cidrs: Vec<IpNetwork>,
    #[serde(default)]
    pub query_types: Vec<RecordType>,
    /// Ordered upstream list, tried round-robin.
    pub upstreams: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_failover")]
    pub failover: bool,
    #[serde(default = "default_rule_enabled")]
    pub enabled: bool,
}

fn default_priority() -> u8 {
    50
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_retries() -> u32 {
    2
}

fn default_failover() -> bool {
    true
}

fn default_rule_enabled() -> bool {
    true
}

impl ForwardingRule {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.upstreams.is_empty() {
            return Err(DomainError::InvalidForwardingRule {
                rule: self.name.to_string(),
                reason: "at least one upstream is required".into(),
            });
        }
        if !(1..=100).contains(&self.priority) {
            return Err(DomainError::InvalidForwardingRule {
                rule: self.name.to_string(),
                reason: format!("priority {} outside 1..=100", self.priority),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_ip_with_default_port() {
        let ep: UpstreamEndpoint = "9.9.9.9".parse().unwrap();
        assert_eq!(ep.addr, "9.9.9.9:53".parse().unwrap());
        assert_eq!(ep.transport, Transport::Udp);
    }

    #[test]
    fn parses_scheme_and_port() {
        let ep: UpstreamEndpoint = "tcp://10.0.0.1:5353".parse().unwrap();
        assert_eq!(ep.transport, Transport::Tcp);
        assert_eq!(ep.addr.port(), 5353);
    }

    #[test]
    fn parses_ipv6() {
        let ep: UpstreamEndpoint = "2620:fe::fe".parse().unwrap();
        assert_eq!(ep.addr.port(), 53);
        let ep: UpstreamEndpoint = "udp://[2620:fe::fe]:5353".parse().unwrap();
        assert_eq!(ep.addr.port(), 5353);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!("tls://1.1.1.1:853".parse::<UpstreamEndpoint>().is_err());
    }

    #[test]
    fn parse_list_skips_blanks() {
        let eps = UpstreamEndpoint::parse_list("1.1.1.1, ,8.8.8.8:53").unwrap();
        assert_eq!(eps.len(), 2);
    }

    #[test]
    fn rule_validation() {
        let mut rule = ForwardingRule {
            name: Arc::from("corp"),
            domains: vec!["*.corp".into()],
            client_cidrs: vec![],
            query_types: vec![],
            upstreams: vec!["10.0.0.1".into()],
            priority: 90,
            timeout_ms: 1000,
            max_retries: 1,
            failover: true,
            enabled: true,
        };
        assert!(rule.validate().is_ok());
        rule.upstreams.clear();
        assert!(rule.validate().is_err());
    }
}
