use super::suffix_trie::SuffixTrie;
use fancy_regex::Regex;
use gloryhole_domain::DomainError;
use std::sync::Arc;

/// Classification of one raw pattern string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass {
    /// Plain name, matched by case-insensitive equality.
    Literal,
    /// `*.x.y` or `.x.y`: matches `x.y` and everything below it.
    Suffix,
    /// Anything carrying regex metacharacters outside the wildcard grammar.
    Regex,
}

/// Classify a raw pattern. The wildcard grammar is exactly a leading `*.`
/// (or a leading dot); any other metacharacter makes it a regex.
pub fn classify(pattern: &str) -> PatternClass {
    let (head, tail) = if let Some(rest) = pattern.strip_prefix("*.") {
        (true, rest)
    } else if let Some(rest) = pattern.strip_prefix('.') {
        (true, rest)
    } else {
        (false, pattern)
    };

    let has_meta = tail
        .chars()
        .any(|c| matches!(c, '^' | '$' | '[' | ']' | '(' | ')' | '{' | '}' | '|' | '+' | '?' | '\\' | '*'));

    match (head, has_meta) {
        (_, true) => PatternClass::Regex,
        (true, false) => PatternClass::Suffix,
        (false, false) => PatternClass::Literal,
    }
}

/// Compiled pattern collection: suffixes in a reversed-label trie, regexes
/// compiled once in source order. Literals are handed back to the caller,
/// which folds them into its exact set.
///
/// Match order is suffixes (the trie is longest-agnostic, any hit wins),
/// then regexes in source order.
#[derive(Debug)]
pub struct PatternSet {
    suffixes: SuffixTrie,
    regexes: Vec<(Arc<str>, Regex)>,
}

impl PatternSet {
    pub fn empty() -> Self {
        Self {
            suffixes: SuffixTrie::new(),
            regexes: Vec::new(),
        }
    }

    /// Compile `patterns`, returning the set and the literal leftovers.
    /// An invalid regex rejects the whole compilation, naming the pattern.
    pub fn compile(patterns: &[String]) -> Result<(Self, Vec<String>), DomainError> {
        let mut suffixes = SuffixTrie::new();
        let mut regexes = Vec::new();
        let mut literals = Vec::new();

        for raw in patterns {
            let pattern = raw.trim().to_ascii_lowercase();
            if pattern.is_empty() {
                continue;
            }
            match classify(&pattern) {
                PatternClass::Literal => literals.push(pattern),
                PatternClass::Suffix => {
                    let suffix = pattern
                        .strip_prefix("*.")
                        .or_else(|| pattern.strip_prefix('.'))
                        .unwrap_or(&pattern);
                    suffixes.insert(suffix.trim_end_matches('.'));
                }
                PatternClass::Regex => {
                    let regex = Regex::new(&pattern).map_err(|e| DomainError::InvalidPattern {
                        pattern: raw.clone(),
                        reason: e.to_string(),
                    })?;
                    regexes.push((Arc::from(pattern.as_str()), regex));
                }
            }
        }

        Ok((Self { suffixes, regexes }, literals))
    }

    #[inline]
    pub fn matches_suffix(&self, domain: &str) -> bool {
        self.suffixes.matches(domain)
    }

    #[inline]
    pub fn matches_regex(&self, domain: &str) -> bool {
        self.regexes
            .iter()
            .any(|(_, regex)| regex.is_match(domain).unwrap_or(false))
    }

    pub fn len(&self) -> usize {
        self.suffixes.len() + self.regexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_wildcard_dot_and_literal_forms() {
        assert_eq!(classify("*.ads.example.com"), PatternClass::Suffix);
        assert_eq!(classify(".tracker.net"), PatternClass::Suffix);
        assert_eq!(classify("plain.example.com"), PatternClass::Literal);
        assert_eq!(classify(r"^ad[0-9]+\."), PatternClass::Regex);
        assert_eq!(classify("ads.*.example"), PatternClass::Regex);
        assert_eq!(classify("*.ads(2).example"), PatternClass::Regex);
    }

    #[test]
    fn suffix_matches_base_and_subdomains() {
        let (set, literals) = PatternSet::compile(&["*.ads.example.com".into()]).unwrap();
        assert!(literals.is_empty());
        assert!(set.matches_suffix("ads.example.com"));
        assert!(set.matches_suffix("foo.ads.example.com"));
        assert!(!set.matches_suffix("example.com"));
    }

    #[test]
    fn regex_matches_in_source_order() {
        let (set, _) = PatternSet::compile(&[r"^ad[0-9]+\.example\.com$".into()]).unwrap();
        assert!(set.matches_regex("ad42.example.com"));
        assert!(!set.matches_regex("ads.example.com"));
    }

    #[test]
    fn invalid_regex_names_the_pattern() {
        let err = PatternSet::compile(&["valid.example".into(), "bad[".into()]).unwrap_err();
        match err {
            DomainError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "bad["),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn literals_are_returned_lowercased() {
        let (_, literals) = PatternSet::compile(&["Tracker.Example.COM".into()]).unwrap();
        assert_eq!(literals, vec!["tracker.example.com".to_string()]);
    }
}
