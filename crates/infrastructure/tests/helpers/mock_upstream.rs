use async_trait::async_trait;
use gloryhole_domain::{DomainError, UpstreamEndpoint};
use gloryhole_infrastructure::dns::forwarding::UpstreamExchanger;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType as WireRecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted upstream: answers A queries for configured domains, NXDOMAIN
/// for everything else, and records which endpoint each exchange hit.
pub struct MockUpstream {
    answers: HashMap<String, Ipv4Addr>,
    ttl: u32,
    calls: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            ttl: 600,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, domain: &str, ip: &str) -> Self {
        self.answers.insert(domain.to_string(), ip.parse().unwrap());
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
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
                let mut record = Record::from_rdata(
                    question.name().clone(),
                    self.ttl,
                    RData::A(A(*ip)),
                );
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

/// Build a client request message.
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
