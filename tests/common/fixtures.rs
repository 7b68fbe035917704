use async_trait::async_trait;
use gloryhole_domain::{DomainError, UpstreamEndpoint};
use gloryhole_infrastructure::dns::cache::ResponseCache;
use gloryhole_infrastructure::dns::forwarding::endpoint::build_pool;
use gloryhole_infrastructure::dns::forwarding::{UpstreamExchanger, UpstreamForwarder};
use gloryhole_infrastructure::dns::{QueryHandler, QueryHandlerBuilder};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType as WireRecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Upstream double: configured A answers, NXDOMAIN otherwise; records the
/// endpoints it was asked through.
pub struct MockUpstream {
    answers: HashMap<String, Ipv4Addr>,
    calls: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, domain: &str, ip: &str) -> Self {
        self.answers.insert(domain.to_string(), ip.parse().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamExchanger for MockUpstream {
    async fn exchange(
        &self,
        endpoint: &UpstreamEndpoint,
        query: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        self.calls.lock().unwrap().push(endpoint.to_string());

        let query = Message::from_bytes(query)
            .map_err(|e| DomainError::MalformedMessage(e.to_string()))?;
        let question = query.queries().first().cloned().unwrap_or_else(Query::new);
        let name = question
            .name()
            .to_string()
            .trim_end_matches('.')
            .to_ascii_lowercase();

        let mut response = Message::new(query.id(), MessageType::Response, OpCode::Query);
        response.add_query(question.clone());

        match self.answers.get(&name) {
            Some(ip) if question.query_type() == WireRecordType::A => {
                response.set_response_code(ResponseCode::NoError);
                let mut record =
                    Record::from_rdata(question.name().clone(), 600, RData::A(A(*ip)));
                record.set_dns_class(DNSClass::IN);
                response.add_answer(record);
            }
            _ => {
                response.set_response_code(ResponseCode::NXDomain);
            }
        }

        response
            .to_bytes()
            .map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }
}

/// A fully wired handler plus handles on the bits the flows inspect.
pub struct Fixture {
    pub handler: QueryHandler,
    pub cache: Arc<ResponseCache>,
    pub upstream: Arc<MockUpstream>,
}

impl Fixture {
    /// Build a handler around a mock upstream. The closure customizes the
    /// builder (blocklists, policies, limiters, ...).
    pub fn build(
        upstream: MockUpstream,
        cache: Arc<ResponseCache>,
        configure: impl FnOnce(QueryHandlerBuilder) -> QueryHandlerBuilder,
    ) -> Self {
        let upstream = Arc::new(upstream);
        let forwarder = Arc::new(UpstreamForwarder::with_exchanger(upstream.clone()));
        let builder = QueryHandler::builder()
            .cache(Arc::clone(&cache))
            .forwarder(forwarder)
            .default_pool(build_pool(&["1.1.1.1".into()]).unwrap());

        Self {
            handler: configure(builder).build(),
            cache,
            upstream,
        }
    }
}

/// Build a client query message.
pub fn request(name: &str, record_type: WireRecordType) -> Message {
    let mut query = Query::new();
    query.set_name(Name::from_str(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    message
}
