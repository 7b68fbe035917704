use super::answers;
use super::blocklist::{BlocklistSet, Whitelist};
use super::cache::{CacheKey, CachedAnswer, ResponseCache, TtlHint};
use super::forwarding::endpoint::EndpointState;
use super::forwarding::{ConditionalForwarder, UpstreamForwarder};
use super::kill_switch::KillSwitch;
use super::local_records::LocalRecordsStore;
use super::policy::{EvalContext, PolicyEngine};
use super::query_log::QueryLogWriter;
use super::rate_limit::{RateDecision, RateLimiter};
use gloryhole_application::ports::{MetricsRecorder, NoopMetrics};
use gloryhole_domain::config::{CacheConfig, ForwarderConfig, RateLimitAction, RateLimitConfig};
use gloryhole_domain::question::QueryClass;
use gloryhole_domain::{
    DomainError, PolicyAction, Question, QueryDecision, RecordType, TraceEvent, UpstreamEndpoint,
};
use hickory_proto::op::{Message, ResponseCode};
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The handler's verdict for one query. `message` is `None` only when the
/// rate limiter's action is `drop`.
pub struct HandlerResponse {
    pub message: Option<Message>,
    pub decision: QueryDecision,
}

/// The query pipeline: rate limit → local records → cache → policy →
/// whitelist → blocklist → forwarder selection → forward. Each stage either
/// produces the final answer or falls through; every served query yields a
/// decision record handed to the log writer.
pub struct QueryHandler {
    cache: Arc<ResponseCache>,
    blocklist: Arc<BlocklistSet>,
    whitelist: Arc<Whitelist>,
    local_records: Arc<LocalRecordsStore>,
    policies: Arc<PolicyEngine>,
    conditional: Arc<ConditionalForwarder>,
    forwarder: Arc<UpstreamForwarder>,
    default_pool: Vec<Arc<EndpointState>>,
    default_timeout: Duration,
    default_retries: u32,
    default_failover: bool,
    rate_limiter: Arc<RateLimiter>,
    kill_switch: Arc<KillSwitch>,
    metrics: Arc<dyn MetricsRecorder>,
    log_writer: Option<Arc<QueryLogWriter>>,
    negative_ttl: u32,
    redirect_ttl: u32,
    decision_trace: bool,
    query_deadline: Duration,
}

pub struct QueryHandlerBuilder {
    cache: Option<Arc<ResponseCache>>,
    blocklist: Option<Arc<BlocklistSet>>,
    whitelist: Option<Arc<Whitelist>>,
    local_records: Option<Arc<LocalRecordsStore>>,
    policies: Option<Arc<PolicyEngine>>,
    conditional: Option<Arc<ConditionalForwarder>>,
    forwarder: Option<Arc<UpstreamForwarder>>,
    default_pool: Vec<Arc<EndpointState>>,
    forwarder_config: ForwarderConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
    kill_switch: Option<Arc<KillSwitch>>,
    metrics: Option<Arc<dyn MetricsRecorder>>,
    log_writer: Option<Arc<QueryLogWriter>>,
    cache_config: CacheConfig,
    decision_trace: bool,
    query_deadline: Duration,
}

impl QueryHandlerBuilder {
    pub fn new() -> Self {
        Self {
            cache: None,
            blocklist: None,
            whitelist: None,
            local_records: None,
            policies: None,
            conditional: None,
            forwarder: None,
            default_pool: Vec::new(),
            forwarder_config: ForwarderConfig::default(),
            rate_limiter: None,
            kill_switch: None,
            metrics: None,
            log_writer: None,
            cache_config: CacheConfig::default(),
            decision_trace: true,
            query_deadline: Duration::from_secs(10),
        }
    }

    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn blocklist(mut self, blocklist: Arc<BlocklistSet>) -> Self {
        self.blocklist = Some(blocklist);
        self
    }

    pub fn whitelist(mut self, whitelist: Arc<Whitelist>) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    pub fn local_records(mut self, store: Arc<LocalRecordsStore>) -> Self {
        self.local_records = Some(store);
        self
    }

    pub fn policies(mut self, engine: Arc<PolicyEngine>) -> Self {
        self.policies = Some(engine);
        self
    }

    pub fn conditional(mut self, forwarder: Arc<ConditionalForwarder>) -> Self {
        self.conditional = Some(forwarder);
        self
    }

    pub fn forwarder(mut self, forwarder: Arc<UpstreamForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn default_pool(mut self, pool: Vec<Arc<EndpointState>>) -> Self {
        self.default_pool = pool;
        self
    }

    pub fn forwarder_config(mut self, config: ForwarderConfig) -> Self {
        self.forwarder_config = config;
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn kill_switch(mut self, switch: Arc<KillSwitch>) -> Self {
        self.kill_switch = Some(switch);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn log_writer(mut self, writer: Arc<QueryLogWriter>) -> Self {
        self.log_writer = Some(writer);
        self
    }

    pub fn decision_trace(mut self, enabled: bool) -> Self {
        self.decision_trace = enabled;
        self
    }

    pub fn query_deadline(mut self, deadline: Duration) -> Self {
        self.query_deadline = deadline;
        self
    }

    pub fn build(self) -> QueryHandler {
        QueryHandler {
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(ResponseCache::new(&self.cache_config))),
            blocklist: self.blocklist.unwrap_or_else(|| Arc::new(BlocklistSet::empty())),
            whitelist: self.whitelist.unwrap_or_else(|| Arc::new(Whitelist::empty())),
            local_records: self
                .local_records
                .unwrap_or_else(|| Arc::new(LocalRecordsStore::new(8))),
            policies: self.policies.unwrap_or_else(|| Arc::new(PolicyEngine::new())),
            conditional: self
                .conditional
                .unwrap_or_else(|| Arc::new(ConditionalForwarder::new())),
            forwarder: self.forwarder.unwrap_or_else(|| Arc::new(UpstreamForwarder::new())),
            default_pool: self.default_pool,
            default_timeout: Duration::from_millis(self.forwarder_config.default_timeout_ms),
            default_retries: self.forwarder_config.default_retries,
            default_failover: self.forwarder_config.default_failover,
            rate_limiter: self
                .rate_limiter
                .unwrap_or_else(|| Arc::new(RateLimiter::new(&RateLimitConfig::default()))),
            kill_switch: self.kill_switch.unwrap_or_else(|| Arc::new(KillSwitch::new())),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            log_writer: self.log_writer,
            negative_ttl: self.cache_config.negative_ttl,
            redirect_ttl: self.cache_config.redirect_ttl,
            decision_trace: self.decision_trace,
            query_deadline: self.query_deadline,
        }
    }
}

impl Default for QueryHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryHandler {
    pub fn builder() -> QueryHandlerBuilder {
        QueryHandlerBuilder::new()
    }

    /// Single entry point for every transport (UDP/TCP listener, DoH
    /// collaborator): one parsed message in, one response plus its
    /// decision record out.
    pub async fn handle_query(&self, request: &Message, client: IpAddr) -> HandlerResponse {
        let started = Instant::now();

        let Some(query) = request.queries().first() else {
            let mut decision =
                QueryDecision::new(Arc::from(""), client, RecordType::Other(0));
            decision.response_code = "FORMERR";
            decision.trace.push(TraceEvent::new("handler", "formerr"));
            return self.finish(Some(answers::formerr(request)), decision, started);
        };

        let question = Question::new(
            &query.name().to_string(),
            RecordType::from_code(u16::from(query.query_type())),
            QueryClass::from_code(u16::from(query.query_class())),
        );
        self.metrics.query_received(question.record_type);

        let mut decision =
            QueryDecision::new(Arc::clone(&question.name), client, question.record_type);

        // 1. Rate limit.
        if let RateDecision::Limited(action) = self.rate_limiter.check(client) {
            self.metrics.query_rate_limited();
            decision
                .trace
                .push(TraceEvent::new("rate_limit", "rate_limited"));
            let message = match action {
                RateLimitAction::Refuse => {
                    decision.response_code = "REFUSED";
                    Some(answers::refused(request))
                }
                RateLimitAction::Drop => {
                    decision.response_code = "DROPPED";
                    None
                }
            };
            return self.finish(message, decision, started);
        }

        // 3. Local records.
        if let Some(rows) = self.local_records.lookup(&question.name, question.record_type) {
            match answers::local_answer(request, &rows) {
                Ok(message) => {
                    decision
                        .trace
                        .push(TraceEvent::new("local_records", "answer"));
                    let ttl = rows.iter().map(|r| r.ttl).min().unwrap_or(0);
                    self.cache.put(
                        CacheKey::from(&question),
                        CachedAnswer::positive(ResponseCode::NoError, message.answers().to_vec()),
                        TtlHint::Positive(ttl),
                    );
                    return self.finish(Some(message), decision, started);
                }
                Err(e) => {
                    warn!(domain = %question.name, error = %e, "Local record synthesis failed");
                    decision.response_code = "SERVFAIL";
                    decision
                        .trace
                        .push(TraceEvent::new("local_records", "error").detail(e.to_string()));
                    return self.finish(Some(answers::servfail(request)), decision, started);
                }
            }
        }

        // 4. Cache.
        let key = CacheKey::from(&question);
        if let Some(entry) = self.cache.get(&key) {
            self.metrics.cache_hit();
            decision.cached = true;
            decision.blocked = entry.answer.blocked;
            let action = if entry.answer.blocked { "blocked_hit" } else { "hit" };
            decision.trace.push(TraceEvent::new("cache", action));

            let remaining = entry.remaining_secs(Instant::now());
            let message = answers::from_cached(request, &entry.answer, remaining);
            decision.response_code = rcode_str(message.response_code());
            return self.finish(Some(message), decision, started);
        }
        if self.cache.enabled() {
            self.metrics.cache_miss();
        }

        // 5. Policy engine.
        let mut allow_forced = false;
        let mut policy_upstreams: Option<Arc<Vec<UpstreamEndpoint>>> = None;
        if self.kill_switch.policies_enabled() {
            let ctx = EvalContext::new(
                Arc::clone(&question.name),
                client,
                question.record_type,
            );
            if let Some(matched) = self.policies.evaluate(&ctx) {
                match matched.action {
                    PolicyAction::Block => {
                        self.metrics.query_blocked();
                        decision.blocked = true;
                        decision.response_code = "NXDOMAIN";
                        decision.trace.push(
                            TraceEvent::new("policy", "BLOCK")
                                .detail(matched.rule_name.to_string()),
                        );
                        let message = answers::nxdomain(request, self.negative_ttl);
                        self.cache.put(
                            key,
                            CachedAnswer::negative(
                                ResponseCode::NXDomain,
                                message.name_servers().to_vec(),
                            )
                            .marked_blocked(),
                            TtlHint::Negative,
                        );
                        return self.finish(Some(message), decision, started);
                    }
                    PolicyAction::Redirect => {
                        decision.trace.push(
                            TraceEvent::new("policy", "REDIRECT")
                                .detail(matched.rule_name.to_string()),
                        );
                        // Compiled REDIRECT rules always carry a target; a
                        // family mismatch degrades to NODATA either way.
                        let redirected = matched.redirect.and_then(|target| {
                            answers::redirect_answer(request, target, self.redirect_ttl)
                        });
                        return match redirected {
                            Some(message) => {
                                self.cache.put(
                                    key,
                                    CachedAnswer::positive(
                                        ResponseCode::NoError,
                                        message.answers().to_vec(),
                                    ),
                                    TtlHint::Redirect,
                                );
                                self.finish(Some(message), decision, started)
                            }
                            None => {
                                let message = answers::nodata(request, self.negative_ttl);
                                self.cache.put(
                                    key,
                                    CachedAnswer::negative(
                                        ResponseCode::NoError,
                                        message.name_servers().to_vec(),
                                    ),
                                    TtlHint::Negative,
                                );
                                self.finish(Some(message), decision, started)
                            }
                        };
                    }
                    PolicyAction::Allow => {
                        allow_forced = true;
                        decision.trace.push(
                            TraceEvent::new("policy", "ALLOW")
                                .detail(matched.rule_name.to_string()),
                        );
                    }
                    PolicyAction::Forward => {
                        decision.trace.push(
                            TraceEvent::new("policy", "FORWARD")
                                .detail(matched.rule_name.to_string()),
                        );
                        policy_upstreams = matched.upstreams.clone();
                    }
                }
            }
        }

        // 6. Whitelist. Suppresses only the blocklist stage.
        if !allow_forced && policy_upstreams.is_none() && self.whitelist.matches(&question.name)
        {
            allow_forced = true;
            decision.trace.push(TraceEvent::new("whitelist", "allow"));
        }

        // 7. Blocklist.
        if !allow_forced
            && policy_upstreams.is_none()
            && self.kill_switch.blocklist_enabled()
        {
            if let Some(source) = self.blocklist.is_blocked(&question.name) {
                self.metrics.query_blocked();
                decision.blocked = true;
                decision.response_code = "NXDOMAIN";
                decision
                    .trace
                    .push(TraceEvent::new("blocklist", "block").source(source.as_str()));
                let message = answers::nxdomain(request, self.negative_ttl);
                self.cache.put(
                    key,
                    CachedAnswer::negative(
                        ResponseCode::NXDomain,
                        message.name_servers().to_vec(),
                    )
                    .marked_blocked(),
                    TtlHint::Negative,
                );
                return self.finish(Some(message), decision, started);
            }
        }

        // 8. Forwarder selection.
        let (endpoints, timeout, retries, failover) = if let Some(upstreams) = policy_upstreams
        {
            let pool = upstreams
                .iter()
                .map(|endpoint| Arc::new(EndpointState::new(endpoint.clone())))
                .collect::<Vec<_>>();
            (pool, self.default_timeout, self.default_retries, self.default_failover)
        } else if let Some(rule) =
            self.conditional
                .matches(&question.name, client, question.record_type)
        {
            decision.trace.push(
                TraceEvent::new("conditional_forward", "match")
                    .detail(rule.rule.name.to_string()),
            );
            (
                rule.endpoints.clone(),
                rule.timeout(),
                rule.rule.max_retries,
                rule.rule.failover,
            )
        } else {
            (
                self.default_pool.clone(),
                self.default_timeout,
                self.default_retries,
                self.default_failover,
            )
        };

        // 9. Forward.
        let forwarded = tokio::time::timeout(
            self.query_deadline,
            self.forwarder
                .forward(&question, &endpoints, timeout, retries, failover),
        )
        .await;

        match forwarded {
            Ok(Ok(outcome)) => {
                self.metrics.query_forwarded();
                decision.upstream = Some(Arc::clone(&outcome.upstream));
                let message = answers::pass_through(request, &outcome.message);
                let rcode = message.response_code();
                decision.response_code = rcode_str(rcode);
                decision.trace.push(
                    TraceEvent::new("forward", "answer")
                        .detail(outcome.upstream.to_string())
                        .metadata(json!({ "rtt_ms": outcome.rtt.as_millis() as u64 })),
                );

                match rcode {
                    ResponseCode::NoError if !message.answers().is_empty() => {
                        let ttl = answers::min_answer_ttl(&message).unwrap_or(0);
                        self.cache.put(
                            key,
                            CachedAnswer::positive(rcode, message.answers().to_vec()),
                            TtlHint::Positive(ttl),
                        );
                    }
                    ResponseCode::NoError | ResponseCode::NXDomain | ResponseCode::Refused => {
                        self.cache.put(
                            key,
                            CachedAnswer::negative(rcode, message.name_servers().to_vec()),
                            TtlHint::Negative,
                        );
                    }
                    _ => {}
                }
                self.finish(Some(message), decision, started)
            }
            Ok(Err(e)) => {
                debug!(domain = %question.name, error = %e, "Forwarding failed");
                decision.response_code = "SERVFAIL";
                decision
                    .trace
                    .push(TraceEvent::new("forward", "error").detail(e.to_string()));
                self.finish(Some(answers::servfail(request)), decision, started)
            }
            Err(_) => {
                // Total query deadline exhausted.
                decision.response_code = "SERVFAIL";
                decision.trace.push(
                    TraceEvent::new("forward", "cancelled")
                        .detail(DomainError::QueryTimeout.to_string()),
                );
                self.finish(Some(answers::servfail(request)), decision, started)
            }
        }
    }

    fn finish(
        &self,
        message: Option<Message>,
        mut decision: QueryDecision,
        started: Instant,
    ) -> HandlerResponse {
        decision.response_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.query_duration_ms(decision.response_time_ms);

        if let Some(writer) = &self.log_writer {
            let mut record = decision.clone();
            if !self.decision_trace {
                record.trace = Default::default();
            }
            writer.record(record);
        }

        HandlerResponse { message, decision }
    }
}

fn rcode_str(rcode: ResponseCode) -> &'static str {
    match rcode {
        ResponseCode::NoError => "NOERROR",
        ResponseCode::NXDomain => "NXDOMAIN",
        ResponseCode::ServFail => "SERVFAIL",
        ResponseCode::Refused => "REFUSED",
        ResponseCode::FormErr => "FORMERR",
        ResponseCode::NotImp => "NOTIMP",
        _ => "OTHER",
    }
}
