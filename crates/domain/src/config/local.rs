use crate::errors::DomainError;
use crate::local_record::{LocalRecord, LocalRecordData};
use crate::record_type::RecordType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Local authoritative records.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalConfig {
    /// Bound on CNAME chain resolution inside the local store.
    #[serde(default = "default_cname_chase_depth")]
    pub cname_chase_depth: usize,

    #[serde(default)]
    pub records: Vec<LocalRecordConfig>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            cname_chase_depth: default_cname_chase_depth(),
            records: vec![],
        }
    }
}

fn default_cname_chase_depth() -> usize {
    8
}

/// TOML shape of one local record:
///
/// ```toml
/// [[local.records]]
/// domain = "nas.home.lan"
/// type = "A"
/// ips = ["192.168.1.100"]
/// ttl = 300
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalRecordConfig {
    pub domain: String,

    #[serde(rename = "type")]
    pub record_type: String,

    #[serde(default)]
    pub ips: Vec<String>,

    /// CNAME / PTR / MX exchange / SRV target.
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub preference: Option<u16>,

    #[serde(default)]
    pub weight: Option<u16>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub txt: Vec<String>,

    #[serde(default)]
    pub ttl: Option<u32>,
}

impl LocalRecordConfig {
    pub fn compile(&self) -> Result<LocalRecord, DomainError> {
        let record_type = RecordType::parse(&self.record_type).ok_or_else(|| {
            DomainError::InvalidLocalRecord {
                domain: self.domain.clone(),
                reason: format!("unknown record type '{}'", self.record_type),
            }
        })?;

        let invalid = |reason: &str| DomainError::InvalidLocalRecord {
            domain: self.domain.clone(),
            reason: reason.to_string(),
        };

        let target = || -> Result<Arc<str>, DomainError> {
            self.target
                .as_deref()
                .map(Arc::from)
                .ok_or_else(|| invalid("missing target"))
        };

        let data = match record_type {
            RecordType::A | RecordType::Aaaa => {
                let ips = self
                    .ips
                    .iter()
                    .map(|s| {
                        s.parse()
                            .map_err(|_| DomainError::InvalidIpAddress(s.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if ips.is_empty() {
                    return Err(invalid("at least one ip is required"));
                }
                let family_ok = ips.iter().all(|ip: &std::net::IpAddr| match record_type {
                    RecordType::A => ip.is_ipv4(),
                    _ => ip.is_ipv6(),
                });
                if !family_ok {
                    return Err(invalid("ip family does not match record type"));
                }
                LocalRecordData::Addresses(ips)
            }
            RecordType::Cname => LocalRecordData::Cname(target()?),
            RecordType::Ptr => LocalRecordData::Ptr(target()?),
            RecordType::Mx => LocalRecordData::Mx {
                preference: self.preference.unwrap_or(10),
                exchange: target()?,
            },
            RecordType::Srv => LocalRecordData::Srv {
                priority: self.preference.unwrap_or(0),
                weight: self.weight.unwrap_or(0),
                port: self.port.ok_or_else(|| invalid("missing port"))?,
                target: target()?,
            },
            RecordType::Txt => {
                if self.txt.is_empty() {
                    return Err(invalid("missing txt strings"));
                }
                LocalRecordData::Txt(self.txt.clone())
            }
            other => {
                return Err(invalid(&format!(
                    "record type {other} is not supported for local records"
                )))
            }
        };

        LocalRecord::new(&self.domain, record_type, data, self.ttl)
    }
}
