//! End-to-end flows through the query pipeline, driving `handle_query`
//! with real wire-shaped messages.

use gloryhole_domain::config::{CacheConfig, RateLimitAction, RateLimitConfig};
use gloryhole_domain::{
    ForwardingRule, LocalRecord, LocalRecordData, PolicyAction, PolicyRule, RecordType,
};
use gloryhole_infrastructure::dns::blocklist::{BlocklistSet, DomainSetSnapshot, Whitelist};
use gloryhole_infrastructure::dns::cache::{CacheKey, ResponseCache};
use gloryhole_infrastructure::dns::forwarding::ConditionalForwarder;
use gloryhole_infrastructure::dns::local_records::LocalRecordsStore;
use gloryhole_infrastructure::dns::policy::PolicyEngine;
use gloryhole_infrastructure::dns::rate_limit::RateLimiter;
use gloryhole_tests::{request, Fixture, MockUpstream};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{RData, RecordType as WireRecordType};
use std::net::IpAddr;
use std::sync::Arc;

fn client() -> IpAddr {
    "192.168.1.10".parse().unwrap()
}

fn default_cache() -> Arc<ResponseCache> {
    Arc::new(ResponseCache::new(&CacheConfig::default()))
}

/// Scenario 1: a local A record answers authoritatively and is cached.
#[tokio::test]
async fn local_a_record_flow() {
    let store = LocalRecordsStore::new(8);
    store.set_records(vec![LocalRecord::new(
        "nas.local",
        RecordType::A,
        LocalRecordData::Addresses(vec!["192.168.1.100".parse().unwrap()]),
        Some(300),
    )
    .unwrap()]);

    let f = Fixture::build(MockUpstream::new(), default_cache(), |b| {
        b.local_records(Arc::new(store))
    });

    let outcome = f
        .handler
        .handle_query(&request("nas.local", WireRecordType::A), client())
        .await;

    let message = outcome.message.unwrap();
    assert_eq!(message.response_code(), ResponseCode::NoError);
    assert_eq!(message.answers().len(), 1);
    match message.answers()[0].data() {
        RData::A(a) => assert_eq!(a.0.to_string(), "192.168.1.100"),
        other => panic!("unexpected rdata {other:?}"),
    }
    assert!(message.answers()[0].ttl() <= 300);

    let events = outcome.decision.trace.events();
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].stage, events[0].action), ("local_records", "answer"));

    // Cached for the next query.
    let key = CacheKey::new("nas.local", RecordType::A, 1);
    assert!(f.cache.get(&key).is_some());
    assert!(f.upstream.calls().is_empty());
}

/// Scenario 2: a wildcard blocklist pattern synthesizes NXDOMAIN and the
/// answer is negative-cached.
#[tokio::test]
async fn blocklist_wildcard_flow() {
    let blocklist = BlocklistSet::new(
        DomainSetSnapshot::compile(&[], &["*.ads.example.com".into()]).unwrap(),
    );
    let cache = default_cache();
    let f = Fixture::build(MockUpstream::new(), Arc::clone(&cache), |b| {
        b.blocklist(Arc::new(blocklist))
    });

    let outcome = f
        .handler
        .handle_query(&request("foo.ads.example.com", WireRecordType::A), client())
        .await;

    assert_eq!(
        outcome.message.unwrap().response_code(),
        ResponseCode::NXDomain
    );
    assert!(outcome.decision.blocked);
    let events = outcome.decision.trace.events();
    assert_eq!(
        (events[0].stage, events[0].action, events[0].source),
        ("blocklist", "block", Some("wildcard"))
    );

    // Negative-cached with the configured negative TTL.
    let key = CacheKey::new("foo.ads.example.com", RecordType::A, 1);
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.ttl, CacheConfig::default().negative_ttl);
    assert!(entry.answer.blocked);
    assert!(f.upstream.calls().is_empty());
}

/// Scenario 3: the whitelist suppresses the blocklist and the query is
/// forwarded.
#[tokio::test]
async fn whitelist_overrides_blocklist_flow() {
    let f = Fixture::build(
        MockUpstream::new().with_answer("tracker.example.com", "203.0.113.7"),
        default_cache(),
        |b| {
            b.blocklist(Arc::new(BlocklistSet::new(
                DomainSetSnapshot::compile(&["tracker.example.com".into()], &[]).unwrap(),
            )))
            .whitelist(Arc::new(Whitelist::new(
                DomainSetSnapshot::compile(&["tracker.example.com".into()], &[]).unwrap(),
            )))
        },
    );

    let outcome = f
        .handler
        .handle_query(&request("tracker.example.com", WireRecordType::A), client())
        .await;

    assert_eq!(
        outcome.message.unwrap().response_code(),
        ResponseCode::NoError,
        "whitelisted domain must be forwarded, not blocked"
    );
    assert!(!outcome.decision.blocked);

    let stages: Vec<&str> = outcome
        .decision
        .trace
        .events()
        .iter()
        .map(|e| e.stage)
        .collect();
    let whitelist_pos = stages.iter().position(|s| *s == "whitelist").unwrap();
    let forward_pos = stages.iter().position(|s| *s == "forward").unwrap();
    assert!(whitelist_pos < forward_pos);
    assert_eq!(f.upstream.calls().len(), 1);
}

/// Scenario 4: policy REDIRECT answers the matching family and NODATA for
/// the other.
#[tokio::test]
async fn policy_redirect_flow() {
    let engine = PolicyEngine::new();
    engine
        .add_rule(
            PolicyRule::new("portal", r#"Domain == "portal.local""#, PolicyAction::Redirect)
                .with_action_data("10.0.0.1"),
        )
        .unwrap();
    let f = Fixture::build(MockUpstream::new(), default_cache(), move |b| {
        b.policies(Arc::new(engine))
    });

    let a = f
        .handler
        .handle_query(&request("portal.local", WireRecordType::A), client())
        .await;
    let message = a.message.unwrap();
    assert_eq!(message.response_code(), ResponseCode::NoError);
    match message.answers()[0].data() {
        RData::A(a) => assert_eq!(a.0.to_string(), "10.0.0.1"),
        other => panic!("unexpected rdata {other:?}"),
    }

    let aaaa = f
        .handler
        .handle_query(&request("portal.local", WireRecordType::AAAA), client())
        .await;
    let message = aaaa.message.unwrap();
    assert_eq!(message.response_code(), ResponseCode::NoError);
    assert!(message.answers().is_empty(), "family mismatch yields NODATA");
}

/// Scenario 5: rate limiting with refuse answers REFUSED beyond the burst.
#[tokio::test]
async fn rate_limit_refuse_flow() {
    let f = Fixture::build(
        MockUpstream::new().with_answer("example.com", "93.184.216.34"),
        default_cache(),
        |b| {
            b.rate_limiter(Arc::new(RateLimiter::new(&RateLimitConfig {
                enabled: true,
                rps: 1.0,
                burst: 1.0,
                action: RateLimitAction::Refuse,
                ..RateLimitConfig::default()
            })))
        },
    );

    let mut noerror = 0;
    let mut refused = 0;
    for _ in 0..5 {
        let outcome = f
            .handler
            .handle_query(&request("example.com", WireRecordType::A), client())
            .await;
        match outcome.message.unwrap().response_code() {
            ResponseCode::NoError => noerror += 1,
            ResponseCode::Refused => refused += 1,
            other => panic!("unexpected rcode {other:?}"),
        }
    }
    assert_eq!((noerror, refused), (1, 4));
}

/// Scenario 6: the higher-priority conditional rule picks the upstream
/// even when a lower-priority rule also matches.
#[tokio::test]
async fn conditional_forwarding_priority_flow() {
    let corp = ForwardingRule {
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
    let ptr = ForwardingRule {
        name: Arc::from("ptr"),
        domains: vec![],
        client_cidrs: vec![],
        query_types: vec![RecordType::Ptr],
        upstreams: vec!["10.0.0.2".into()],
        priority: 50,
        timeout_ms: 1000,
        max_retries: 1,
        failover: true,
        enabled: true,
    };
    let conditional = ConditionalForwarder::from_rules(vec![ptr, corp]).unwrap();

    let f = Fixture::build(MockUpstream::new(), default_cache(), move |b| {
        b.conditional(Arc::new(conditional))
    });

    let outcome = f
        .handler
        .handle_query(&request("x.corp", WireRecordType::PTR), client())
        .await;

    assert_eq!(
        outcome.decision.upstream.as_deref(),
        Some("udp://10.0.0.1:53"),
        "priority 90 rule wins over priority 50"
    );
    assert_eq!(f.upstream.calls(), vec!["udp://10.0.0.1:53"]);
}
