// rill-values - CHAMP trie nodes for the persistent map and set
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Hash mixer and CHAMP trie node family.
//!
//! The trie is a 32-way hash-array-mapped prefix tree in canonical (CHAMP)
//! form: the same set of entries always produces the same node structure,
//! regardless of the order of insertions and removals. Nodes come in two
//! variants: bitmap-indexed branching nodes and hash-collision leaves.
//!
//! Keys are dispatched on 5-bit slices of a *mixed* 32-bit hash, taken from
//! the most significant bits downwards. The mixer is applied once per
//! operation at the wrapper level; every function in this module assumes it
//! already has been.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Bits consumed per trie level (5 bits = 32-way branching).
pub(crate) const BIT_PARTITION_SIZE: u32 = 5;

/// Shift value of the deepest level, which dispatches on the low 5 bits.
const MAX_SHIFT: u32 = 30;

/// Identity token of a transient builder.
///
/// A node carrying a token may be mutated in place by the transient holding
/// the identical token (`Arc::ptr_eq`). Frozen nodes carry no token, or a
/// token no live transient holds.
pub(crate) type Owner = Arc<OwnerTag>;

/// Zero-sized referent of an [`Owner`] token; only its identity matters.
#[derive(Debug, Default)]
pub(crate) struct OwnerTag;

// ============================================================================
// Hashing
// ============================================================================

/// Computes the 64-bit structural hash of a value with the standard hasher.
pub(crate) fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Folds a 64-bit hash onto 32 bits before mixing.
#[inline]
pub(crate) const fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Redistributes the bits of a raw 32-bit hash before trie dispatch.
///
/// Mixes the upper half into the lower so that clustered low bits do not pile
/// up in the shallow trie levels. The same bijection is applied to every hash
/// before the trie (or the intern cache) uses it.
#[inline]
pub(crate) const fn mix(hash: u32) -> u32 {
    let mut h = hash.wrapping_add(!(hash << 9));
    h ^= h >> 14;
    h = h.wrapping_add(h << 4);
    h ^ (h >> 10)
}

/// The mixed trie hash of a key.
pub(crate) fn key_hash<K: Hash + ?Sized>(key: &K) -> u32 {
    mix(fold_hash(hash_of(key)))
}

/// Extracts the 5-bit slot of `hash` at the given shift.
///
/// Slices run from the most significant bits downwards; the deepest level
/// dispatches on the low 5 bits directly.
#[inline]
const fn mask(hash: u32, shift: u32) -> u32 {
    if shift >= MAX_SHIFT {
        hash & 0b11111
    } else {
        (hash >> (27 - shift)) & 0b11111
    }
}

/// Single-bit bitmap position for a slot.
#[inline]
const fn bitpos(mask: u32) -> u32 {
    1 << mask
}

/// Dense index of `bit` within `bitmap`: the number of set bits below it.
#[inline]
const fn index(bitmap: u32, bit: u32) -> usize {
    (bitmap & bit.wrapping_sub(1)).count_ones() as usize
}

// ============================================================================
// Node family
// ============================================================================

/// A CHAMP trie node.
pub(crate) enum Node<K, V> {
    /// Bitmap-indexed branching node.
    Bitmap(BitmapNode<K, V>),
    /// Leaf holding two or more entries whose mixed hashes are identical.
    Collision(CollisionNode<K, V>),
}

/// Bitmap-indexed branching node.
///
/// Bit `i` of `data_map` marks slot `i` as a payload entry; bit `i` of
/// `node_map` marks it as a sub-node. The bitmaps are disjoint. Entries and
/// children are packed in ascending slot order and addressed by popcount.
pub(crate) struct BitmapNode<K, V> {
    data_map: u32,
    node_map: u32,
    entries: Vec<(K, V)>,
    children: Vec<Arc<Node<K, V>>>,
    owner: Option<Owner>,
}

/// Hash-collision leaf: parallel key/value arrays of length >= 2, all keys
/// sharing the same mixed hash and mutually distinct under `Eq`.
pub(crate) struct CollisionNode<K, V> {
    hash: u32,
    keys: Vec<K>,
    vals: Vec<V>,
}

/// Outcome of an insert-or-update.
pub(crate) enum Update<V> {
    /// The key was present with an equal value; nothing changed.
    Unchanged,
    /// A new entry was introduced.
    Added,
    /// The key was present; its previous value is returned.
    Replaced(V),
}

/// Outcome of a removal.
pub(crate) enum Removal<V> {
    /// The key was not present; the node is unchanged.
    NotFound,
    /// The entry was erased; its value is returned.
    Removed(V),
}

impl<K, V> Node<K, V> {
    /// An empty bitmap node (used as the root of an empty trie).
    pub(crate) fn empty() -> Self {
        Node::Bitmap(BitmapNode {
            data_map: 0,
            node_map: 0,
            entries: Vec::new(),
            children: Vec::new(),
            owner: None,
        })
    }

    /// Number of payload entries stored directly in this node.
    pub(crate) fn payload_arity(&self) -> usize {
        match self {
            Node::Bitmap(b) => b.entries.len(),
            Node::Collision(c) => c.keys.len(),
        }
    }

    /// Number of sub-nodes (always zero for collision leaves).
    pub(crate) fn node_arity(&self) -> usize {
        match self {
            Node::Bitmap(b) => b.children.len(),
            Node::Collision(_) => 0,
        }
    }

    /// True when this node holds exactly one payload entry and no sub-nodes,
    /// so a parent may inline it.
    fn is_lone_payload(&self) -> bool {
        self.payload_arity() == 1 && self.node_arity() == 0
    }
}

impl<K, V> BitmapNode<K, V> {
    pub(crate) fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    pub(crate) fn children(&self) -> &[Arc<Node<K, V>>] {
        &self.children
    }
}

impl<K: Clone, V: Clone> BitmapNode<K, V> {
    /// Copy of this node owned by `owner`.
    fn cloned(&self, owner: Option<Owner>) -> Self {
        BitmapNode {
            data_map: self.data_map,
            node_map: self.node_map,
            entries: self.entries.clone(),
            children: self.children.clone(),
            owner,
        }
    }
}

/// Whether the transient identified by `owner` may mutate the node in place.
fn allowed_to_edit<K, V>(node: &Node<K, V>, owner: Option<&Owner>) -> bool {
    match (node, owner) {
        (Node::Bitmap(b), Some(o)) => b
            .owner
            .as_ref()
            .is_some_and(|node_owner| Arc::ptr_eq(node_owner, o)),
        // Collision nodes are always copied, as are nodes without a token.
        _ => false,
    }
}

/// Obtains a mutable bitmap node in `slot`, reusing the allocation when the
/// transient owns it and copying otherwise.
fn editable<'s, K: Clone, V: Clone>(
    slot: &'s mut Arc<Node<K, V>>,
    owner: Option<&Owner>,
) -> &'s mut BitmapNode<K, V> {
    let reuse = allowed_to_edit(slot, owner)
        && Arc::strong_count(slot) == 1
        && Arc::weak_count(slot) == 0;
    if !reuse {
        let copy = match slot.as_ref() {
            Node::Bitmap(b) => b.cloned(owner.cloned()),
            // Callers only request editable access to bitmap nodes.
            Node::Collision(_) => unreachable!("collision nodes are copied, never edited"),
        };
        *slot = Arc::new(Node::Bitmap(copy));
    }
    match Arc::get_mut(slot) {
        Some(Node::Bitmap(b)) => b,
        // The slot is uniquely owned: either verified or freshly created.
        _ => unreachable!("bitmap node is uniquely owned"),
    }
}

// ============================================================================
// Lookup
// ============================================================================

/// Finds the value stored under `key`, if any.
pub(crate) fn find<'n, K: Eq, V>(
    node: &'n Node<K, V>,
    key: &K,
    hash: u32,
    shift: u32,
) -> Option<&'n V> {
    match node {
        Node::Bitmap(b) => {
            let bit = bitpos(mask(hash, shift));
            if b.data_map & bit != 0 {
                let (k, v) = &b.entries[index(b.data_map, bit)];
                if k == key {
                    Some(v)
                } else {
                    None
                }
            } else if b.node_map & bit != 0 {
                let child = &b.children[index(b.node_map, bit)];
                find(child, key, hash, shift + BIT_PARTITION_SIZE)
            } else {
                None
            }
        }
        Node::Collision(c) => {
            if c.hash != hash {
                return None;
            }
            c.keys
                .iter()
                .position(|k| k == key)
                .map(|idx| &c.vals[idx])
        }
    }
}

// ============================================================================
// Insert / update
// ============================================================================

/// Inserts `key -> val` under `slot`, copying nodes unless the transient
/// identified by `owner` created them.
pub(crate) fn update<K, V>(
    slot: &mut Arc<Node<K, V>>,
    owner: Option<&Owner>,
    key: &K,
    val: &V,
    hash: u32,
    shift: u32,
) -> Update<V>
where
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    enum Plan<K, V> {
        SetValue { idx: usize, old: V },
        Unchanged,
        MergePayload { idx: usize, existing: (K, V) },
        Descend { idx: usize },
        InsertPayload { idx: usize },
    }

    let plan = match slot.as_ref() {
        Node::Bitmap(b) => {
            let bit = bitpos(mask(hash, shift));
            if b.data_map & bit != 0 {
                let idx = index(b.data_map, bit);
                let (k, v) = &b.entries[idx];
                if k == key {
                    if v == val {
                        Plan::Unchanged
                    } else {
                        Plan::SetValue {
                            idx,
                            old: v.clone(),
                        }
                    }
                } else {
                    Plan::MergePayload {
                        idx,
                        existing: (k.clone(), v.clone()),
                    }
                }
            } else if b.node_map & bit != 0 {
                Plan::Descend {
                    idx: index(b.node_map, bit),
                }
            } else {
                Plan::InsertPayload {
                    idx: index(b.data_map, bit),
                }
            }
        }
        Node::Collision(_) => return update_collision(slot, key, val, hash, shift),
    };

    let bit = bitpos(mask(hash, shift));
    match plan {
        Plan::Unchanged => Update::Unchanged,
        Plan::SetValue { idx, old } => {
            let b = editable(slot, owner);
            b.entries[idx].1 = val.clone();
            Update::Replaced(old)
        }
        Plan::MergePayload { idx, existing } => {
            // Two distinct keys occupy the slot: push both one level down and
            // migrate the slot from the data map to the node map.
            let existing_hash = key_hash(&existing.0);
            let sub = merge_two_pairs(
                existing.0,
                existing.1,
                existing_hash,
                key.clone(),
                val.clone(),
                hash,
                shift + BIT_PARTITION_SIZE,
            );
            let b = editable(slot, owner);
            b.entries.remove(idx);
            b.data_map ^= bit;
            b.node_map |= bit;
            b.children.insert(index(b.node_map, bit), Arc::new(sub));
            Update::Added
        }
        Plan::Descend { idx } => {
            if allowed_to_edit(slot, owner) {
                let b = editable(slot, owner);
                return update(
                    &mut b.children[idx],
                    owner,
                    key,
                    val,
                    hash,
                    shift + BIT_PARTITION_SIZE,
                );
            }
            let Node::Bitmap(b) = slot.as_ref() else {
                unreachable!("descend plan only applies to bitmap nodes")
            };
            let mut child = b.children[idx].clone();
            let result = update(&mut child, owner, key, val, hash, shift + BIT_PARTITION_SIZE);
            if matches!(result, Update::Unchanged) {
                return result;
            }
            let b = editable(slot, owner);
            b.children[idx] = child;
            result
        }
        Plan::InsertPayload { idx } => {
            let b = editable(slot, owner);
            b.entries.insert(idx, (key.clone(), val.clone()));
            b.data_map |= bit;
            Update::Added
        }
    }
}

fn update_collision<K, V>(
    slot: &mut Arc<Node<K, V>>,
    key: &K,
    val: &V,
    hash: u32,
    shift: u32,
) -> Update<V>
where
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    enum Plan {
        PushDown { node_hash: u32 },
        Unchanged,
        SetValue { idx: usize },
        Append,
    }

    let (node_hash, plan) = {
        let Node::Collision(c) = slot.as_ref() else {
            unreachable!("caller matched a collision node")
        };
        let plan = if c.hash != hash {
            Plan::PushDown { node_hash: c.hash }
        } else if let Some(idx) = c.keys.iter().position(|k| k == key) {
            if c.vals[idx] == *val {
                Plan::Unchanged
            } else {
                Plan::SetValue { idx }
            }
        } else {
            Plan::Append
        };
        (c.hash, plan)
    };

    match plan {
        Plan::Unchanged => Update::Unchanged,
        Plan::PushDown { node_hash } => {
            // Only reachable through an internal merge: wrap the collision
            // node under a fresh bitmap node at this depth and insert the
            // pair there.
            let mut wrapped = Arc::new(push_down(slot.clone(), node_hash, hash, shift));
            let result = update(&mut wrapped, None, key, val, hash, shift);
            *slot = wrapped;
            result
        }
        Plan::SetValue { idx } => {
            let (keys, mut vals) = clone_collision_arrays(slot);
            let old = std::mem::replace(&mut vals[idx], val.clone());
            *slot = Arc::new(Node::Collision(CollisionNode {
                hash: node_hash,
                keys,
                vals,
            }));
            Update::Replaced(old)
        }
        Plan::Append => {
            let (mut keys, mut vals) = clone_collision_arrays(slot);
            keys.push(key.clone());
            vals.push(val.clone());
            *slot = Arc::new(Node::Collision(CollisionNode {
                hash: node_hash,
                keys,
                vals,
            }));
            Update::Added
        }
    }
}

fn clone_collision_arrays<K: Clone, V: Clone>(slot: &Arc<Node<K, V>>) -> (Vec<K>, Vec<V>) {
    match slot.as_ref() {
        Node::Collision(c) => (c.keys.clone(), c.vals.clone()),
        Node::Bitmap(_) => unreachable!("caller matched a collision node"),
    }
}

/// Builds the smallest subtree containing two distinct keys, starting at
/// `shift`. Produces a collision leaf when the mixed hashes are identical.
fn merge_two_pairs<K, V>(
    key0: K,
    val0: V,
    hash0: u32,
    key1: K,
    val1: V,
    hash1: u32,
    shift: u32,
) -> Node<K, V> {
    if hash0 == hash1 {
        return Node::Collision(CollisionNode {
            hash: hash0,
            keys: vec![key0, key1],
            vals: vec![val0, val1],
        });
    }

    let mask0 = mask(hash0, shift);
    let mask1 = mask(hash1, shift);
    if mask0 != mask1 {
        // Both fit in one node; keep the entries in ascending slot order.
        let data_map = bitpos(mask0) | bitpos(mask1);
        let entries = if mask0 < mask1 {
            vec![(key0, val0), (key1, val1)]
        } else {
            vec![(key1, val1), (key0, val0)]
        };
        Node::Bitmap(BitmapNode {
            data_map,
            node_map: 0,
            entries,
            children: Vec::new(),
            owner: None,
        })
    } else {
        let sub = merge_two_pairs(
            key0,
            val0,
            hash0,
            key1,
            val1,
            hash1,
            shift + BIT_PARTITION_SIZE,
        );
        Node::Bitmap(BitmapNode {
            data_map: 0,
            node_map: bitpos(mask0),
            entries: Vec::new(),
            children: vec![Arc::new(sub)],
            owner: None,
        })
    }
}

/// Wraps a collision node as the sub-node of a new bitmap node at `shift`,
/// choosing the branch level where its hash and `other_hash` diverge.
fn push_down<K, V>(
    collision: Arc<Node<K, V>>,
    collision_hash: u32,
    other_hash: u32,
    shift: u32,
) -> Node<K, V> {
    let mask0 = mask(collision_hash, shift);
    let mask1 = mask(other_hash, shift);
    if mask0 != mask1 {
        Node::Bitmap(BitmapNode {
            data_map: 0,
            node_map: bitpos(mask0),
            entries: Vec::new(),
            children: vec![collision],
            owner: None,
        })
    } else {
        let sub = push_down(
            collision,
            collision_hash,
            other_hash,
            shift + BIT_PARTITION_SIZE,
        );
        Node::Bitmap(BitmapNode {
            data_map: 0,
            node_map: bitpos(mask0),
            entries: Vec::new(),
            children: vec![Arc::new(sub)],
            owner: None,
        })
    }
}

// ============================================================================
// Remove
// ============================================================================

/// Removes `key` from the subtree in `slot`.
///
/// When the removal leaves a lone payload entry behind, the slot is replaced
/// by a depth-0 singleton node so the caller can inline it (or adopt it as
/// the new root).
pub(crate) fn remove<K, V>(
    slot: &mut Arc<Node<K, V>>,
    owner: Option<&Owner>,
    key: &K,
    hash: u32,
    shift: u32,
) -> Removal<V>
where
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    enum Plan {
        NotFound,
        EraseToSingleton { idx: usize },
        ErasePayload { idx: usize },
        Descend { idx: usize },
    }

    let plan = match slot.as_ref() {
        Node::Bitmap(b) => {
            let bit = bitpos(mask(hash, shift));
            if b.data_map & bit != 0 {
                let idx = index(b.data_map, bit);
                if b.entries[idx].0 != *key {
                    Plan::NotFound
                } else if b.entries.len() == 2 && b.children.is_empty() {
                    Plan::EraseToSingleton { idx }
                } else {
                    Plan::ErasePayload { idx }
                }
            } else if b.node_map & bit != 0 {
                Plan::Descend {
                    idx: index(b.node_map, bit),
                }
            } else {
                Plan::NotFound
            }
        }
        Node::Collision(_) => return remove_collision(slot, key),
    };

    let bit = bitpos(mask(hash, shift));
    match plan {
        Plan::NotFound => Removal::NotFound,
        Plan::EraseToSingleton { idx } => {
            // Rebuild the surviving pair as a depth-0 singleton. At any depth
            // below the root the survivor shares the removed key's depth-0
            // slot, so the removed hash picks the correct bit.
            let Node::Bitmap(b) = slot.as_ref() else {
                unreachable!("erase plan only applies to bitmap nodes")
            };
            let data_map = if shift == 0 {
                b.data_map ^ bit
            } else {
                bitpos(mask(hash, 0))
            };
            let survivor = b.entries[1 - idx].clone();
            let removed = b.entries[idx].1.clone();
            *slot = Arc::new(Node::Bitmap(BitmapNode {
                data_map,
                node_map: 0,
                entries: vec![survivor],
                children: Vec::new(),
                owner: owner.cloned(),
            }));
            Removal::Removed(removed)
        }
        Plan::ErasePayload { idx } => {
            let b = editable(slot, owner);
            let (_, removed) = b.entries.remove(idx);
            b.data_map ^= bit;
            Removal::Removed(removed)
        }
        Plan::Descend { idx } => {
            let Node::Bitmap(b) = slot.as_ref() else {
                unreachable!("descend plan only applies to bitmap nodes")
            };
            let mut child = b.children[idx].clone();
            let result = remove(&mut child, owner, key, hash, shift + BIT_PARTITION_SIZE);
            if matches!(result, Removal::NotFound) {
                return result;
            }
            if child.is_lone_payload() {
                if b.entries.is_empty() && b.children.len() == 1 {
                    // Trivial one-child root passthrough: escalate the
                    // singleton so an ancestor (or the root) inlines it.
                    *slot = child;
                    return result;
                }
                // Migrate the lone entry back inline (node map -> data map).
                let (k, v) = match child.as_ref() {
                    Node::Bitmap(cb) => cb.entries[0].clone(),
                    Node::Collision(_) => unreachable!("collision nodes hold >= 2 entries"),
                };
                let b = editable(slot, owner);
                b.children.remove(idx);
                b.node_map ^= bit;
                b.data_map |= bit;
                b.entries.insert(index(b.data_map, bit), (k, v));
            } else {
                let b = editable(slot, owner);
                b.children[idx] = child;
            }
            result
        }
    }
}

fn remove_collision<K, V>(slot: &mut Arc<Node<K, V>>, key: &K) -> Removal<V>
where
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    let (node_hash, idx, len, removed) = {
        let Node::Collision(c) = slot.as_ref() else {
            unreachable!("caller matched a collision node")
        };
        let Some(idx) = c.keys.iter().position(|k| k == key) else {
            return Removal::NotFound;
        };
        (c.hash, idx, c.keys.len(), c.vals[idx].clone())
    };

    if len == 2 {
        // Re-insert the survivor into an empty node at depth 0 so the parent
        // can inline it.
        let (keys, vals) = clone_collision_arrays(slot);
        let survivor_idx = 1 - idx;
        *slot = Arc::new(Node::Bitmap(BitmapNode {
            data_map: bitpos(mask(node_hash, 0)),
            node_map: 0,
            entries: vec![(keys[survivor_idx].clone(), vals[survivor_idx].clone())],
            children: Vec::new(),
            owner: None,
        }));
    } else {
        let (mut keys, mut vals) = clone_collision_arrays(slot);
        keys.remove(idx);
        vals.remove(idx);
        *slot = Arc::new(Node::Collision(CollisionNode {
            hash: node_hash,
            keys,
            vals,
        }));
    }
    Removal::Removed(removed)
}

// ============================================================================
// Structural equality
// ============================================================================

impl<K: PartialEq, V: PartialEq> PartialEq for Node<K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Bitmap(a), Node::Bitmap(b)) => {
                a.data_map == b.data_map
                    && a.node_map == b.node_map
                    && a.entries == b.entries
                    && a.children.len() == b.children.len()
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(x, y)| Arc::ptr_eq(x, y) || x == y)
            }
            (Node::Collision(a), Node::Collision(b)) => {
                // Order in the parallel arrays is insertion history, not
                // content; compare as a multiset.
                a.hash == b.hash
                    && a.keys.len() == b.keys.len()
                    && a.keys.iter().zip(&a.vals).all(|(k, v)| {
                        b.keys
                            .iter()
                            .position(|bk| bk == k)
                            .is_some_and(|j| b.vals[j] == *v)
                    })
            }
            _ => false,
        }
    }
}

impl<K: Eq, V: Eq> Eq for Node<K, V> {}

// ============================================================================
// Iteration
// ============================================================================

/// Depth-first iterator over all entries of a subtree.
pub(crate) struct NodeIter<'a, K, V> {
    stack: Vec<Frame<'a, K, V>>,
}

struct Frame<'a, K, V> {
    node: &'a Node<K, V>,
    entry: usize,
    child: usize,
}

impl<'a, K, V> NodeIter<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>) -> Self {
        NodeIter {
            stack: root
                .map(|node| {
                    vec![Frame {
                        node,
                        entry: 0,
                        child: 0,
                    }]
                })
                .unwrap_or_default(),
        }
    }
}

impl<'a, K, V> Iterator for NodeIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            match frame.node {
                Node::Bitmap(b) => {
                    if frame.entry < b.entries.len() {
                        let (k, v) = &b.entries[frame.entry];
                        frame.entry += 1;
                        return Some((k, v));
                    }
                    if frame.child < b.children.len() {
                        let child = &b.children[frame.child];
                        frame.child += 1;
                        self.stack.push(Frame {
                            node: child,
                            entry: 0,
                            child: 0,
                        });
                        continue;
                    }
                    self.stack.pop();
                }
                Node::Collision(c) => {
                    if frame.entry < c.keys.len() {
                        let idx = frame.entry;
                        frame.entry += 1;
                        return Some((&c.keys[idx], &c.vals[idx]));
                    }
                    self.stack.pop();
                }
            }
        }
    }
}

// ============================================================================
// Invariant checking (test support)
// ============================================================================

/// Verifies the structural invariants of a subtree.
///
/// Checked per node: the bitmaps are disjoint; payload and child counts equal
/// the popcounts; every payload sits in the slot its hash selects; collision
/// leaves hold at least two entries on one shared hash; below the root no
/// node is empty or a lone payload.
pub(crate) fn check_invariants<K: Eq + Hash, V>(
    node: &Node<K, V>,
    shift: u32,
    is_root: bool,
) -> bool {
    match node {
        Node::Bitmap(b) => {
            if b.data_map & b.node_map != 0 {
                return false;
            }
            if b.entries.len() != b.data_map.count_ones() as usize
                || b.children.len() != b.node_map.count_ones() as usize
            {
                return false;
            }
            // Below the root a node is never empty and never a lone payload
            // (parents inline those). Single-child chain nodes are legal:
            // they arise when key hashes share a slice prefix.
            if !is_root && b.children.is_empty() && b.entries.len() <= 1 {
                return false;
            }
            for (i, (k, _)) in b.entries.iter().enumerate() {
                // Each payload must sit in the slot its hash selects.
                let slot = nth_set_bit(b.data_map, i);
                if mask(key_hash(k), shift) != slot {
                    return false;
                }
            }
            b.children
                .iter()
                .all(|c| check_invariants(c, shift + BIT_PARTITION_SIZE, false))
        }
        Node::Collision(c) => {
            c.keys.len() >= 2
                && c.keys.len() == c.vals.len()
                && c.keys.iter().all(|k| key_hash(k) == c.hash)
        }
    }
}

fn nth_set_bit(bitmap: u32, n: usize) -> u32 {
    let mut seen = 0;
    for pos in 0..32 {
        if bitmap & (1 << pos) != 0 {
            if seen == n {
                return pos;
            }
            seen += 1;
        }
    }
    32
}
