use crate::errors::DomainError;
use crate::question::normalize_name;
use crate::record_type::RecordType;
use std::net::IpAddr;
use std::sync::Arc;

/// Payload of a local record, by record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalRecordData {
    /// A / AAAA. Mixed families are allowed; the store filters by the
    /// queried type at answer time.
    Addresses(Vec<IpAddr>),
    Cname(Arc<str>),
    Mx { preference: u16, exchange: Arc<str> },
    Srv { priority: u16, weight: u16, port: u16, target: Arc<str> },
    Txt(Vec<String>),
    Ptr(Arc<str>),
}

impl LocalRecordData {
    pub fn record_type_matches(&self, record_type: RecordType) -> bool {
        match self {
            LocalRecordData::Addresses(_) => record_type.is_address(),
            LocalRecordData::Cname(_) => record_type == RecordType::Cname,
            LocalRecordData::Mx { .. } => record_type == RecordType::Mx,
            LocalRecordData::Srv { .. } => record_type == RecordType::Srv,
            LocalRecordData::Txt(_) => record_type == RecordType::Txt,
            LocalRecordData::Ptr(_) => record_type == RecordType::Ptr,
        }
    }
}

/// One authoritative local record. `domain` is stored normalized; a leading
/// `*.` marks a wildcard, which lives in a separate list consulted only when
/// no exact `(domain, type)` entry exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub data: LocalRecordData,
    pub ttl: u32,
    pub wildcard: bool,
}

pub const DEFAULT_LOCAL_TTL: u32 = 300;

impl LocalRecord {
    pub fn new(
        domain: &str,
        record_type: RecordType,
        data: LocalRecordData,
        ttl: Option<u32>,
    ) -> Result<Self, DomainError> {
        if !data.record_type_matches(record_type) {
            return Err(DomainError::InvalidLocalRecord {
                domain: domain.to_string(),
                reason: format!("payload does not match record type {record_type}"),
            });
        }

        let (wildcard, name) = match domain.strip_prefix("*.") {
            Some(rest) => (true, rest),
            None => (false, domain),
        };
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(DomainError::InvalidLocalRecord {
                domain: domain.to_string(),
                reason: "empty domain".into(),
            });
        }

        Ok(Self {
            domain: Arc::from(name),
            record_type,
            data,
            ttl: ttl.unwrap_or(DEFAULT_LOCAL_TTL),
            wildcard,
        })
    }

    /// For a wildcard record `*.x.y`: matches any name strictly below `x.y`.
    pub fn wildcard_matches(&self, name: &str) -> bool {
        self.wildcard
            && name.len() > self.domain.len()
            && name.ends_with(&*self.domain)
            && name.as_bytes()[name.len() - self.domain.len() - 1] == b'.'
    }

    /// Wildcard specificity: more labels in the suffix wins.
    pub fn specificity(&self) -> usize {
        self.domain.split('.').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(ips: &[&str]) -> LocalRecordData {
        LocalRecordData::Addresses(ips.iter().map(|s| s.parse().unwrap()).collect())
    }

    #[test]
    fn wildcard_prefix_is_detected_and_stripped() {
        let r = LocalRecord::new("*.Lab.Home", RecordType::A, a(&["10.0.0.1"]), None).unwrap();
        assert!(r.wildcard);
        assert_eq!(&*r.domain, "lab.home");
        assert_eq!(r.ttl, DEFAULT_LOCAL_TTL);
    }

    #[test]
    fn wildcard_matches_subdomains_only() {
        let r = LocalRecord::new("*.lab.home", RecordType::A, a(&["10.0.0.1"]), None).unwrap();
        assert!(r.wildcard_matches("nas.lab.home"));
        assert!(r.wildcard_matches("a.b.lab.home"));
        assert!(!r.wildcard_matches("lab.home"));
        assert!(!r.wildcard_matches("xlab.home"));
    }

    #[test]
    fn payload_must_match_type() {
        let err = LocalRecord::new("x.home", RecordType::Txt, a(&["10.0.0.1"]), None);
        assert!(err.is_err());
    }

    #[test]
    fn cname_payload() {
        let r = LocalRecord::new(
            "www.home",
            RecordType::Cname,
            LocalRecordData::Cname(Arc::from("web.home")),
            Some(60),
        )
        .unwrap();
        assert_eq!(r.ttl, 60);
        assert!(!r.wildcard);
    }
}
