use compact_str::CompactString;
use gloryhole_domain::{Question, RecordType};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Cache key: normalized name + type + class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: CompactString,
    pub record_type: RecordType,
    pub class: u16,
}

impl CacheKey {
    pub fn new(name: &str, record_type: RecordType, class: u16) -> Self {
        Self {
            name: CompactString::from(name),
            record_type,
            class,
        }
    }

    /// Stable hash used for shard selection.
    #[inline]
    pub fn shard_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl From<&Question> for CacheKey {
    fn from(question: &Question) -> Self {
        Self::new(
            &question.name,
            question.record_type,
            question.class.code(),
        )
    }
}
