use super::patterns::PatternSet;
use compact_str::CompactString;
use gloryhole_domain::question::normalize_name;
use gloryhole_domain::DomainError;
use rustc_hash::FxHashSet;

/// What matched a blocked domain. Carried into the decision trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    Exact,
    Wildcard,
    Regex,
}

impl BlockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockSource::Exact => "exact",
            BlockSource::Wildcard => "wildcard",
            BlockSource::Regex => "regex",
        }
    }
}

/// Immutable compiled domain set: exact names plus a pattern matcher.
/// Used for both the blocklist and the whitelist; published via `ArcSwap`,
/// so readers see either the old or the new set, never a torn view.
///
/// Literal patterns are folded into the exact set at compile time. Exact
/// entries match only the full name; subdomains are the suffix trie's job.
pub struct DomainSetSnapshot {
    exact: FxHashSet<CompactString>,
    patterns: PatternSet,
}

impl DomainSetSnapshot {
    pub fn empty() -> Self {
        Self {
            exact: FxHashSet::default(),
            patterns: PatternSet::empty(),
        }
    }

    pub fn compile(domains: &[String], patterns: &[String]) -> Result<Self, DomainError> {
        let (pattern_set, literals) = PatternSet::compile(patterns)?;

        let mut exact = FxHashSet::default();
        exact.reserve(domains.len() + literals.len());
        for domain in domains {
            let name = normalize_name(domain.trim());
            if !name.is_empty() {
                exact.insert(CompactString::from(name));
            }
        }
        for literal in literals {
            exact.insert(CompactString::from(literal.trim_end_matches('.')));
        }

        Ok(Self {
            exact,
            patterns: pattern_set,
        })
    }

    /// New snapshot with `base`'s exact set and a freshly compiled pattern
    /// matcher. Literal patterns are folded into the copied exact set.
    pub fn compile_with_exact_of(
        base: &DomainSetSnapshot,
        patterns: &[String],
    ) -> Result<Self, DomainError> {
        let (pattern_set, literals) = PatternSet::compile(patterns)?;
        let mut exact = base.exact.clone();
        for literal in literals {
            exact.insert(CompactString::from(literal.trim_end_matches('.')));
        }
        Ok(Self {
            exact,
            patterns: pattern_set,
        })
    }

    /// Exact first, then wildcard suffixes, then regexes.
    #[inline]
    pub fn lookup(&self, domain: &str) -> Option<BlockSource> {
        if self.exact.contains(domain) {
            return Some(BlockSource::Exact);
        }
        if self.patterns.matches_suffix(domain) {
            return Some(BlockSource::Wildcard);
        }
        if self.patterns.matches_regex(domain) {
            return Some(BlockSource::Regex);
        }
        None
    }

    #[inline]
    pub fn contains(&self, domain: &str) -> bool {
        self.lookup(domain).is_some()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
