use arc_swap::ArcSwap;
use compact_str::CompactString;
use gloryhole_domain::{LocalRecord, LocalRecordData, RecordType};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// One synthesized answer row: owner name, TTL and payload.
#[derive(Debug, Clone)]
pub struct LocalAnswerRecord {
    pub owner: Arc<str>,
    pub ttl: u32,
    pub data: LocalRecordData,
}

struct LocalIndex {
    exact: FxHashMap<(CompactString, RecordType), Arc<LocalRecord>>,
    /// Most specific (longest suffix) first; consulted only on exact miss.
    wildcards: Vec<Arc<LocalRecord>>,
}

impl LocalIndex {
    fn empty() -> Self {
        Self {
            exact: FxHashMap::default(),
            wildcards: Vec::new(),
        }
    }

    fn find(&self, name: &str, record_type: RecordType) -> Option<&Arc<LocalRecord>> {
        let key = (CompactString::from(name), record_type);
        if let Some(record) = self.exact.get(&key) {
            return Some(record);
        }
        self.wildcards
            .iter()
            .find(|w| w.record_type == record_type && w.wildcard_matches(name))
    }
}

/// Authoritative local records with wildcard fallback and bounded CNAME
/// chasing. The index is immutable and swapped wholesale; multi-IP answers
/// rotate per request via an atomic rotor.
pub struct LocalRecordsStore {
    index: ArcSwap<LocalIndex>,
    rotor: AtomicUsize,
    chase_depth: usize,
}

impl LocalRecordsStore {
    pub fn new(chase_depth: usize) -> Self {
        Self {
            index: ArcSwap::from_pointee(LocalIndex::empty()),
            rotor: AtomicUsize::new(0),
            chase_depth,
        }
    }

    pub fn set_records(&self, records: Vec<LocalRecord>) {
        let mut exact = FxHashMap::default();
        let mut wildcards: Vec<Arc<LocalRecord>> = Vec::new();

        let count = records.len();
        for record in records {
            let record = Arc::new(record);
            if record.wildcard {
                wildcards.push(record);
            } else {
                exact.insert(
                    (CompactString::from(&*record.domain), record.record_type),
                    record,
                );
            }
        }
        wildcards.sort_by(|a, b| b.specificity().cmp(&a.specificity()));

        self.index.store(Arc::new(LocalIndex { exact, wildcards }));
        info!(records = count, "Local records published");
    }

    pub fn len(&self) -> usize {
        let index = self.index.load();
        index.exact.len() + index.wildcards.len()
    }

    /// Resolve `(domain, qtype)` against the local store.
    ///
    /// For A/AAAA queries, CNAME links are followed up to the chase bound;
    /// if the chain leaves the local namespace (or exceeds the bound), the
    /// collected CNAMEs are the answer and upstream finishes the job.
    pub fn lookup(&self, domain: &str, qtype: RecordType) -> Option<Vec<LocalAnswerRecord>> {
        let index = self.index.load();
        let rotation = self.rotor.fetch_add(1, Ordering::Relaxed);

        let mut out: Vec<LocalAnswerRecord> = Vec::new();
        let mut current: Arc<str> = Arc::from(domain);

        for _ in 0..=self.chase_depth {
            if let Some(record) = index.find(&current, qtype) {
                out.push(answer_from(&current, record, qtype, rotation));
                return Some(out);
            }

            if !qtype.is_address() || out.len() >= self.chase_depth {
                break;
            }

            match index.find(&current, RecordType::Cname) {
                Some(record) => {
                    let target = match &record.data {
                        LocalRecordData::Cname(target) => Arc::clone(target),
                        _ => break,
                    };
                    out.push(LocalAnswerRecord {
                        owner: Arc::clone(&current),
                        ttl: record.ttl,
                        data: LocalRecordData::Cname(Arc::clone(&target)),
                    });
                    current = target;
                }
                None => break,
            }
        }

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

fn answer_from(
    owner: &Arc<str>,
    record: &Arc<LocalRecord>,
    qtype: RecordType,
    rotation: usize,
) -> LocalAnswerRecord {
    let data = match &record.data {
        LocalRecordData::Addresses(ips) => {
            let mut ips: Vec<IpAddr> = ips
                .iter()
                .copied()
                .filter(|ip| match qtype {
                    RecordType::A => ip.is_ipv4(),
                    RecordType::Aaaa => ip.is_ipv6(),
                    _ => true,
                })
                .collect();
            if ips.len() > 1 {
                let len = ips.len();
                ips.rotate_left(rotation % len);
            }
            LocalRecordData::Addresses(ips)
        }
        other => other.clone(),
    };

    LocalAnswerRecord {
        owner: Arc::clone(owner),
        ttl: record.ttl,
        data,
    }
}
