use crate::record_type::RecordType;
use serde::Serialize;
use smallvec::SmallVec;
use std::net::IpAddr;
use std::sync::Arc;

/// One breadcrumb appended by a pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub stage: &'static str,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TraceEvent {
    pub fn new(stage: &'static str, action: &'static str) -> Self {
        Self {
            stage,
            action,
            source: None,
            detail: None,
            metadata: None,
        }
    }

    pub fn source(mut self, source: &'static str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Trace buffer for one request. Inline capacity covers every pipeline path
/// (each stage appends at most one breadcrumb); it spills only if stages grow.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: SmallVec<[TraceEvent; 8]>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialized once, when the decision is handed to the log writer.
    pub fn to_json(&self) -> Option<String> {
        if self.events.is_empty() {
            return None;
        }
        serde_json::to_string(&self.events).ok()
    }
}

/// Per-query decision record: what was asked, what was answered and why.
#[derive(Debug, Clone)]
pub struct QueryDecision {
    pub domain: Arc<str>,
    pub client_ip: IpAddr,
    pub record_type: RecordType,
    pub response_code: &'static str,
    pub blocked: bool,
    pub cached: bool,
    pub response_time_ms: f64,
    pub upstream: Option<Arc<str>>,
    pub trace: Trace,
}

impl QueryDecision {
    pub fn new(domain: Arc<str>, client_ip: IpAddr, record_type: RecordType) -> Self {
        Self {
            domain,
            client_ip,
            record_type,
            response_code: "NOERROR",
            blocked: false,
            cached: false,
            response_time_ms: 0.0,
            upstream: None,
            trace: Trace::new(),
        }
    }
}
