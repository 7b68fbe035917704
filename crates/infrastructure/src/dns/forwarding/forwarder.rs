use super::endpoint::EndpointState;
use super::transport::{NetExchanger, UpstreamExchanger};
use gloryhole_domain::{DomainError, Question, Transport, UpstreamEndpoint};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RecordType as WireRecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable, BinEncoder};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A definitive upstream answer.
#[derive(Debug)]
pub struct ForwardOutcome {
    pub message: Message,
    pub upstream: Arc<str>,
    pub rtt: Duration,
}

/// Round-robin forwarder over an endpoint list, with per-attempt timeout,
/// transport-error and (optional) SERVFAIL failover and a TC-bit retry over
/// TCP against the same endpoint. Total attempts are bounded by
/// `1 + max_retries`.
pub struct UpstreamForwarder {
    exchanger: Arc<dyn UpstreamExchanger>,
    cursor: AtomicUsize,
}

impl UpstreamForwarder {
    pub fn new() -> Self {
        Self::with_exchanger(Arc::new(NetExchanger))
    }

    pub fn with_exchanger(exchanger: Arc<dyn UpstreamExchanger>) -> Self {
        Self {
            exchanger,
            cursor: AtomicUsize::new(0),
        }
    }

    pub async fn forward(
        &self,
        question: &Question,
        endpoints: &[Arc<EndpointState>],
        timeout: Duration,
        max_retries: u32,
        failover: bool,
    ) -> Result<ForwardOutcome, DomainError> {
        if endpoints.is_empty() {
            return Err(DomainError::UpstreamUnavailable(
                "no upstream endpoints configured".into(),
            ));
        }

        let (id, query_bytes) = build_upstream_query(question)?;
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let attempts = max_retries as usize + 1;
        let mut last_error: Option<DomainError> = None;

        for i in 0..attempts {
            let state = &endpoints[(start + i) % endpoints.len()];

            match self.attempt(state, id, &query_bytes, timeout).await {
                Ok(outcome) => {
                    if outcome.message.response_code() == ResponseCode::ServFail && failover {
                        warn!(upstream = %state.display, "Upstream answered SERVFAIL, failing over");
                        last_error = Some(DomainError::UpstreamUnavailable(format!(
                            "{} answered SERVFAIL",
                            state.display
                        )));
                        continue;
                    }
                    return Ok(outcome);
                }
                Err(e) => {
                    debug!(upstream = %state.display, error = %e, "Upstream attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DomainError::UpstreamUnavailable("all attempts failed".into())))
    }

    /// One attempt against one endpoint, including the in-flight gauge,
    /// RTT sample and the truncation fallback to TCP.
    async fn attempt(
        &self,
        state: &Arc<EndpointState>,
        id: u16,
        query_bytes: &[u8],
        timeout: Duration,
    ) -> Result<ForwardOutcome, DomainError> {
        let started = Instant::now();
        state.begin_request();
        let result = self
            .exchanger
            .exchange(&state.endpoint, query_bytes, timeout)
            .await;
        state.end_request();

        let message = parse_response(&result?, id)?;
        let rtt = started.elapsed();
        state.record_rtt(rtt);

        if message.truncated() && state.endpoint.transport == Transport::Udp {
            debug!(upstream = %state.display, "Truncated UDP response, retrying over TCP");
            let tcp = UpstreamEndpoint::new(state.endpoint.addr, Transport::Tcp);
            let raw = self.exchanger.exchange(&tcp, query_bytes, timeout).await?;
            let message = parse_response(&raw, id)?;
            return Ok(ForwardOutcome {
                message,
                upstream: Arc::clone(&state.display),
                rtt: started.elapsed(),
            });
        }

        Ok(ForwardOutcome {
            message,
            upstream: Arc::clone(&state.display),
            rtt,
        })
    }
}

impl Default for UpstreamForwarder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_response(raw: &[u8], expected_id: u16) -> Result<Message, DomainError> {
    let message = Message::from_bytes(raw)
        .map_err(|e| DomainError::MalformedMessage(format!("upstream response: {e}")))?;
    if message.id() != expected_id {
        return Err(DomainError::MalformedMessage(format!(
            "response id {} does not match query id {expected_id}",
            message.id()
        )));
    }
    Ok(message)
}

/// Build the wire query for the upstream leg: fresh random id, RD set,
/// single question.
pub fn build_upstream_query(question: &Question) -> Result<(u16, Vec<u8>), DomainError> {
    let name = Name::from_str(&question.name).map_err(|e| {
        DomainError::InvalidDomainName(format!("'{}': {e}", question.name))
    })?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(WireRecordType::from(question.record_type.code()));
    query.set_query_class(DNSClass::IN);

    let id = fastrand::u16(..);
    let mut message = Message::new(id, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);

    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DomainError::MalformedMessage(format!("encode query: {e}")))?;

    Ok((id, buf))
}
