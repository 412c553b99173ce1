//! Subsequence-search trie: a radix-compressed trie whose lookup reports
//! every stored key that prefixes the query at a given position.

/// Radix-compressed trie over symbol sequences.
///
/// Keys are non-empty sequences; `insert` never overwrites an existing
/// value.  [`SssTree::lookup_prefixes`] returns all valued keys that are
/// prefixes of `doc[start..]`, shortest first — the caller advances by the
/// longest match.
#[derive(Debug, Clone)]
pub struct SssTree<T, V> {
    children: Vec<SssNode<T, V>>,
}

#[derive(Debug, Clone)]
struct SssNode<T, V> {
    key: Vec<T>,
    value: Option<V>,
    children: Vec<SssNode<T, V>>,
}

impl<T, V> Default for SssTree<T, V> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
        }
    }
}

impl<T, V> SssTree<T, V>
where
    T: Clone + Eq,
    V: Clone,
{
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Whether the tree holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Inserts `key` with `value`.
    ///
    /// When the exact key already exists without a value the value is set;
    /// when it exists with a value the existing value is kept.
    pub fn insert(&mut self, key: &[T], value: V) {
        assert!(!key.is_empty(), "trie keys must be non-empty");
        for child in &mut self.children {
            if child.key[0] == key[0] {
                child.insert(key, value);
                return;
            }
        }
        self.children.push(SssNode {
            key: key.to_vec(),
            value: Some(value),
            children: Vec::new(),
        });
    }

    /// Returns `(matched_prefix, value)` for every valued key that prefixes
    /// `doc[start..]`, ordered by increasing length.
    #[must_use]
    pub fn lookup_prefixes(&self, doc: &[T], start: usize) -> Vec<(Vec<T>, V)> {
        self.lookup_prefix_lengths(doc, start)
            .into_iter()
            .map(|(len, value)| (doc[start..start + len].to_vec(), value))
            .collect()
    }

    /// Variant of [`SssTree::lookup_prefixes`] that reports match lengths
    /// instead of materialising the prefixes.
    #[must_use]
    pub fn lookup_prefix_lengths(&self, doc: &[T], start: usize) -> Vec<(usize, V)> {
        let mut matches = Vec::new();
        if start >= doc.len() {
            return matches;
        }
        let mut matched = 0;
        let mut nodes = &self.children;
        loop {
            let next = nodes.iter().find(|n| n.key[0] == doc[start + matched]);
            let Some(node) = next else { break };
            let end = start + matched + node.key.len();
            if end > doc.len() || doc[start + matched..end] != node.key[..] {
                break;
            }
            matched += node.key.len();
            if let Some(value) = &node.value {
                matches.push((matched, value.clone()));
            }
            if start + matched >= doc.len() {
                break;
            }
            nodes = &node.children;
        }
        matches
    }
}

impl<T, V> SssNode<T, V>
where
    T: Clone + Eq,
    V: Clone,
{
    fn insert(&mut self, key: &[T], value: V) {
        let shared = self
            .key
            .iter()
            .zip(key)
            .take_while(|(a, b)| *a == *b)
            .count();

        if shared == key.len() {
            if shared == self.key.len() {
                // Exact key; never overwrite an existing value.
                if self.value.is_none() {
                    self.value = Some(value);
                }
                return;
            }
            // The new key is a proper prefix of this node: split.
            let tail = SssNode {
                key: self.key[shared..].to_vec(),
                value: self.value.take(),
                children: std::mem::take(&mut self.children),
            };
            self.key.truncate(shared);
            self.value = Some(value);
            self.children = vec![tail];
            return;
        }

        let rest = &key[shared..];
        if shared == self.key.len() {
            // This node's key is a prefix of the new key: descend.
            for child in &mut self.children {
                if child.key[0] == rest[0] {
                    child.insert(rest, value);
                    return;
                }
            }
            self.children.push(SssNode {
                key: rest.to_vec(),
                value: Some(value),
                children: Vec::new(),
            });
        } else {
            // Keys diverge after `shared` symbols: split into two branches.
            let tail = SssNode {
                key: self.key[shared..].to_vec(),
                value: self.value.take(),
                children: std::mem::take(&mut self.children),
            };
            let leaf = SssNode {
                key: rest.to_vec(),
                value: Some(value),
                children: Vec::new(),
            };
            self.key.truncate(shared);
            self.value = None;
            self.children = vec![tail, leaf];
        }
    }
}
