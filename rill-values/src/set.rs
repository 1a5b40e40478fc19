// rill-values - Persistent and transient hash set
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Persistent hash set over the CHAMP trie.
//!
//! The set is the map instantiated at unit values; its cumulative hash is the
//! running XOR of the element hashes alone, maintained incrementally the same
//! way the map maintains its entry contributions.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::node::{self, Node, NodeIter, Owner, OwnerTag, Removal, Update};

/// Persistent hash set with structural sharing.
pub struct TrieSet<K> {
    root: Option<Arc<Node<K, ()>>>,
    size: usize,
    hash: u64,
}

impl<K> TrieSet<K> {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        TrieSet {
            root: None,
            size: 0,
            hash: 0,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the set holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Cumulative hash: the XOR of all element hashes.
    #[must_use]
    pub fn cumulative_hash(&self) -> u64 {
        self.hash
    }

    /// Iterator over all elements, in trie order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: NodeIter::new(self.root.as_deref()),
        }
    }
}

impl<K> TrieSet<K>
where
    K: Clone + Eq + Hash,
{
    /// True when `element` is a member.
    #[must_use]
    pub fn contains(&self, element: &K) -> bool {
        match &self.root {
            Some(root) => node::find(root, element, node::key_hash(element), 0).is_some(),
            None => false,
        }
    }

    /// Returns a set including `element`.
    #[must_use]
    pub fn insert(&self, element: K) -> Self {
        let hash = node::key_hash(&element);
        let element_h = node::hash_of(&element);
        let mut root = match &self.root {
            Some(root) => root.clone(),
            None => Arc::new(Node::empty()),
        };
        match node::update(&mut root, None, &element, &(), hash, 0) {
            Update::Unchanged | Update::Replaced(()) => TrieSet {
                root: self.root.clone(),
                size: self.size,
                hash: self.hash,
            },
            Update::Added => TrieSet {
                root: Some(root),
                size: self.size + 1,
                hash: self.hash ^ element_h,
            },
        }
    }

    /// Returns a set without `element`.
    #[must_use]
    pub fn remove(&self, element: &K) -> Self {
        let Some(existing_root) = &self.root else {
            return self.clone();
        };
        let hash = node::key_hash(element);
        let mut root = existing_root.clone();
        match node::remove(&mut root, None, element, hash, 0) {
            Removal::NotFound => self.clone(),
            Removal::Removed(()) => {
                let root = if self.size == 1 { None } else { Some(root) };
                TrieSet {
                    root,
                    size: self.size - 1,
                    hash: self.hash ^ node::hash_of(element),
                }
            }
        }
    }

    /// A transient builder seeded with this set's contents.
    #[must_use]
    pub fn as_transient(&self) -> TransientTrieSet<K> {
        TransientTrieSet {
            root: self.root.clone(),
            size: self.size,
            hash: self.hash,
            owner: Arc::new(OwnerTag),
        }
    }

    /// Verifies the structural invariants of the underlying trie.
    #[doc(hidden)]
    pub fn satisfies_invariants(&self) -> bool {
        match &self.root {
            Some(root) => node::check_invariants(root, 0, true),
            None => true,
        }
    }
}

impl<K> Clone for TrieSet<K> {
    fn clone(&self) -> Self {
        TrieSet {
            root: self.root.clone(),
            size: self.size,
            hash: self.hash,
        }
    }
}

impl<K> Default for TrieSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> PartialEq for TrieSet<K>
where
    K: Clone + Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size || self.hash != other.hash {
            return false;
        }
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl<K> Eq for TrieSet<K> where K: Clone + Eq + Hash {}

impl<K> Hash for TrieSet<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.size);
        state.write_u64(self.hash);
    }
}

impl<K: std::fmt::Debug> std::fmt::Debug for TrieSet<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K> FromIterator<K> for TrieSet<K>
where
    K: Clone + Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut transient = TransientTrieSet::new();
        for element in iter {
            transient.insert(element);
        }
        transient.freeze()
    }
}

/// Iterator over the elements of a [`TrieSet`].
pub struct Iter<'a, K> {
    inner: NodeIter<'a, K, ()>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, ())| k)
    }
}

impl<'a, K> IntoIterator for &'a TrieSet<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Transient
// ============================================================================

/// Single-writer builder for a [`TrieSet`].
pub struct TransientTrieSet<K> {
    root: Option<Arc<Node<K, ()>>>,
    size: usize,
    hash: u64,
    owner: Owner,
}

impl<K> TransientTrieSet<K>
where
    K: Clone + Eq + Hash,
{
    /// An empty transient set.
    #[must_use]
    pub fn new() -> Self {
        TransientTrieSet {
            root: None,
            size: 0,
            hash: 0,
            owner: Arc::new(OwnerTag),
        }
    }

    /// Number of elements so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when no elements have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True when `element` is already a member.
    #[must_use]
    pub fn contains(&self, element: &K) -> bool {
        match &self.root {
            Some(root) => node::find(root, element, node::key_hash(element), 0).is_some(),
            None => false,
        }
    }

    /// Adds `element`; returns true when it was new.
    pub fn insert(&mut self, element: K) -> bool {
        let hash = node::key_hash(&element);
        let element_h = node::hash_of(&element);
        let root = self
            .root
            .get_or_insert_with(|| Arc::new(Node::empty()));
        match node::update(root, Some(&self.owner), &element, &(), hash, 0) {
            Update::Unchanged | Update::Replaced(()) => false,
            Update::Added => {
                self.size += 1;
                self.hash ^= element_h;
                true
            }
        }
    }

    /// Removes `element`; returns true when it was present.
    pub fn remove(&mut self, element: &K) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let hash = node::key_hash(element);
        match node::remove(root, Some(&self.owner), element, hash, 0) {
            Removal::NotFound => false,
            Removal::Removed(()) => {
                self.size -= 1;
                self.hash ^= node::hash_of(element);
                if self.size == 0 {
                    self.root = None;
                }
                true
            }
        }
    }

    /// Freezes the transient into its persistent form.
    #[must_use]
    pub fn freeze(self) -> TrieSet<K> {
        TrieSet {
            root: self.root,
            size: self.size,
            hash: self.hash,
        }
    }
}

impl<K> Default for TransientTrieSet<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_membership() {
        let set: TrieSet<i64> = [1, 2, 3].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&2));
        assert!(!set.contains(&4));

        let grown = set.insert(4);
        assert!(grown.contains(&4));
        assert!(!set.contains(&4), "original is unchanged");
    }

    #[test]
    fn duplicate_insert_is_identity() {
        let set: TrieSet<i64> = [1, 2, 3].into_iter().collect();
        let again = set.insert(2);
        assert_eq!(set, again);
        assert_eq!(set.cumulative_hash(), again.cumulative_hash());
    }

    #[test]
    fn cumulative_hash_is_element_xor() {
        let set: TrieSet<i64> = (0..100).collect();
        let mut expected = 0u64;
        for element in set.iter() {
            expected ^= node::hash_of(element);
        }
        assert_eq!(set.cumulative_hash(), expected);
        assert!(set.satisfies_invariants());
    }

    #[test]
    fn removal_restores_hash() {
        let base: TrieSet<i64> = (0..50).collect();
        let grown = base.insert(1000);
        let shrunk = grown.remove(&1000);
        assert_eq!(shrunk, base);
        assert_eq!(shrunk.cumulative_hash(), base.cumulative_hash());
    }
}
