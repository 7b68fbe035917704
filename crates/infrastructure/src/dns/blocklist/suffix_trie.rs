use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Default)]
#[derive(Debug)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// A suffix pattern terminates at this node.
    terminal: bool,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: HashMap::with_hasher(FxBuildHasher),
            terminal: false,
        }
    }
}

/// Suffix trie for wildcard domain patterns, stored as reversed label paths.
///
/// `*.ads.example` is inserted as ["example", "ads"] with the "ads" node
/// marked terminal. A lookup matches when its reversed labels pass through a
/// terminal node, so the suffix itself (`ads.example`) matches, and so does
/// every subdomain (`x.ads.example`).
///
/// Built once per snapshot and published behind an `ArcSwap`.
#[derive(Default, Debug)]
pub struct SuffixTrie {
    root: TrieNode,
    len: usize,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a bare suffix (`ads.example`; any `*.` / leading dot is
    /// stripped by the caller).
    pub fn insert(&mut self, suffix: &str) {
        let mut node = &mut self.root;
        for label in suffix.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.len += 1;
        }
    }

    /// True if `domain` equals any stored suffix or sits below one.
    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        let labels: SmallVec<[&str; 8]> = domain.split('.').rev().collect();
        let mut node = &self.root;

        for label in labels {
            match node.children.get(label) {
                Some(child) => {
                    if child.terminal {
                        return true;
                    }
                    node = child;
                }
                None => return false,
            }
        }

        false
    }
}
