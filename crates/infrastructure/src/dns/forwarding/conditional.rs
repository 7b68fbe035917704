use super::endpoint::{build_pool, EndpointState};
use crate::dns::blocklist::DomainSetSnapshot;
use arc_swap::ArcSwap;
use gloryhole_domain::{DomainError, ForwardingRule, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A forwarding rule with its selectors compiled and upstreams resolved.
pub struct CompiledForwardRule {
    pub rule: ForwardingRule,
    /// Compiled domain selector; `None` means the selector is a wildcard.
    domains: Option<DomainSetSnapshot>,
    pub endpoints: Vec<Arc<EndpointState>>,
}

impl CompiledForwardRule {
    fn compile(rule: ForwardingRule) -> Result<Self, DomainError> {
        rule.validate()?;

        let domains = if rule.domains.is_empty() {
            None
        } else {
            Some(DomainSetSnapshot::compile(&[], &rule.domains).map_err(|e| {
                DomainError::InvalidForwardingRule {
                    rule: rule.name.to_string(),
                    reason: e.to_string(),
                }
            })?)
        };

        let endpoints = build_pool(&rule.upstreams).map_err(|e| {
            DomainError::InvalidForwardingRule {
                rule: rule.name.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            rule,
            domains,
            endpoints,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.rule.timeout_ms)
    }

    /// AND across populated selectors, OR within each.
    fn matches(&self, domain: &str, client: IpAddr, qtype: RecordType) -> bool {
        if let Some(domains) = &self.domains {
            if !domains.contains(domain) {
                return false;
            }
        }
        if !self.rule.client_cidrs.is_empty()
            && !self.rule.client_cidrs.iter().any(|cidr| cidr.contains(client))
        {
            return false;
        }
        if !self.rule.query_types.is_empty() && !self.rule.query_types.contains(&qtype) {
            return false;
        }
        true
    }
}

/// Priority-ordered conditional forwarding rules behind an atomic pointer.
/// Sorted by descending priority, then insertion order; first match wins.
pub struct ConditionalForwarder {
    rules: ArcSwap<Vec<Arc<CompiledForwardRule>>>,
}

impl ConditionalForwarder {
    pub fn new() -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn from_rules(rules: Vec<ForwardingRule>) -> Result<Self, DomainError> {
        let forwarder = Self::new();
        forwarder.set_rules(rules)?;
        Ok(forwarder)
    }

    /// Compile and publish a whole new rule list. A compile error leaves
    /// the published list unchanged.
    pub fn set_rules(&self, rules: Vec<ForwardingRule>) -> Result<(), DomainError> {
        let mut compiled: Vec<Arc<CompiledForwardRule>> = rules
            .into_iter()
            .map(|rule| CompiledForwardRule::compile(rule).map(Arc::new))
            .collect::<Result<_, _>>()?;

        // Stable sort keeps insertion order within equal priorities.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));

        info!(rules = compiled.len(), "Conditional forwarding rules published");
        self.rules.store(Arc::new(compiled));
        Ok(())
    }

    pub fn matches(
        &self,
        domain: &str,
        client: IpAddr,
        qtype: RecordType,
    ) -> Option<Arc<CompiledForwardRule>> {
        let rules = self.rules.load();
        rules
            .iter()
            .find(|rule| rule.rule.enabled && rule.matches(domain, client, qtype))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConditionalForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    fn rule(name: &str, priority: u8) -> ForwardingRule {
        ForwardingRule {
            name: StdArc::from(name),
            domains: vec![],
            client_cidrs: vec![],
            query_types: vec![],
            upstreams: vec!["10.0.0.1".into()],
            priority,
            timeout_ms: 1000,
            max_retries: 1,
            failover: true,
            enabled: true,
        }
    }

    fn client() -> IpAddr {
        "192.168.1.10".parse().unwrap()
    }

    #[test]
    fn empty_selectors_match_everything() {
        let forwarder = ConditionalForwarder::from_rules(vec![rule("all", 50)]).unwrap();
        assert!(forwarder
            .matches("anything.example", client(), RecordType::Txt)
            .is_some());
    }

    #[test]
    fn domain_selector_supports_wildcards() {
        let mut r = rule("corp", 50);
        r.domains = vec!["*.corp".into()];
        let forwarder = ConditionalForwarder::from_rules(vec![r]).unwrap();

        assert!(forwarder.matches("git.corp", client(), RecordType::A).is_some());
        assert!(forwarder.matches("corp", client(), RecordType::A).is_some());
        assert!(forwarder.matches("example.com", client(), RecordType::A).is_none());
    }

    #[test]
    fn selectors_are_anded() {
        let mut r = rule("lan-ptr", 50);
        r.client_cidrs = vec!["192.168.1.0/24".parse().unwrap()];
        r.query_types = vec![RecordType::Ptr];
        let forwarder = ConditionalForwarder::from_rules(vec![r]).unwrap();

        assert!(forwarder
            .matches("1.1.168.192.in-addr.arpa", client(), RecordType::Ptr)
            .is_some());
        assert!(forwarder
            .matches("1.1.168.192.in-addr.arpa", client(), RecordType::A)
            .is_none());
        assert!(forwarder
            .matches(
                "1.1.168.192.in-addr.arpa",
                "10.9.9.9".parse().unwrap(),
                RecordType::Ptr
            )
            .is_none());
    }

    #[test]
    fn higher_priority_wins_regardless_of_insertion_order() {
        let mut low = rule("low", 50);
        low.query_types = vec![RecordType::Ptr];
        let mut high = rule("high", 90);
        high.domains = vec!["*.corp".into()];

        let forwarder = ConditionalForwarder::from_rules(vec![low, high]).unwrap();

        // Matches both: the priority-90 rule is consulted first.
        let matched = forwarder.matches("x.corp", client(), RecordType::Ptr).unwrap();
        assert_eq!(&*matched.rule.name, "high");
    }

    #[test]
    fn equal_priority_keeps_insertion_order() {
        let forwarder =
            ConditionalForwarder::from_rules(vec![rule("first", 50), rule("second", 50)]).unwrap();
        let matched = forwarder.matches("x.example", client(), RecordType::A).unwrap();
        assert_eq!(&*matched.rule.name, "first");
    }

    #[test]
    fn disabled_rules_never_match() {
        let mut r = rule("off", 50);
        r.enabled = false;
        let forwarder = ConditionalForwarder::from_rules(vec![r]).unwrap();
        assert!(forwarder.matches("x.example", client(), RecordType::A).is_none());
    }

    #[test]
    fn invalid_rule_leaves_published_list_unchanged() {
        let forwarder = ConditionalForwarder::from_rules(vec![rule("good", 50)]).unwrap();
        let mut bad = rule("bad", 200); // priority outside 1..=100
        bad.priority = 0;
        assert!(forwarder.set_rules(vec![bad]).is_err());
        assert_eq!(forwarder.len(), 1);
    }
}
