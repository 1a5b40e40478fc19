// rill-values - Concurrent weak hash-consing cache
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! The global hash-consing cache.
//!
//! Every value produced by the factory is routed through [`intern`], which
//! returns *the* canonical instance structurally equal to the candidate,
//! installing the candidate itself only when no equal instance is currently
//! live. Entries hold their referent behind a weak reference, so the cache
//! never prolongs a value's lifetime; an entry is removed only because its
//! referent died, never for capacity.
//!
//! Structure: an open hash table of bucket chains. The table pointer sits
//! behind a readers/writer lock (readers: lookup, insert, cleanup; the only
//! writer is a resize, which replaces the table wholesale). Chain heads and
//! the `next` links are atomic references: a lookup walks a snapshot of the
//! chain without acquiring any lock, an insert swings the head with a
//! compare-and-swap, and an unlink compare-and-swaps either the head or the
//! predecessor's `next`, restarting its walk when a racing insert or unlink
//! got there first. In the absence of a resize a lookup never blocks.
//!
//! Reclamation: dropping the last strong reference to a canonical value
//! enqueues its bucket hash on the cleared queue (the `Drop` of the value
//! plays the role of a collector's reference queue). Cleanup drains the
//! queue and unlinks dead entries; every entry carries an atomic claim flag
//! so two racing cleanups settle who unlinks and accounts for an entry, and
//! the loser skips it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::node::{fold_hash, mix};
use crate::value::{Value, ValueData};

const MINIMAL_CAPACITY: usize = 1 << 4;
const MAX_CAPACITY: usize = 1 << 30;

/// Ticket stored inside a canonical value, locating its cache entry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InternHandle {
    hash: u32,
}

type Link = Option<Arc<Entry>>;

/// One chain node. Unlinked entries keep their `next` pointer intact so a
/// concurrent walk passing through them still reaches the live tail.
struct Entry {
    hash: u32,
    referent: Weak<ValueData>,
    /// Claim guard: the cleanup that flips this unlinks the entry and
    /// accounts for the removal; racing cleanups skip it.
    claimed: AtomicBool,
    next: ArcSwapOption<Entry>,
}

impl Entry {
    fn is_dead(&self) -> bool {
        self.referent.strong_count() == 0
    }

    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

struct Bucket {
    head: ArcSwapOption<Entry>,
}

struct Table {
    buckets: Box<[Bucket]>,
}

impl Table {
    fn with_capacity(capacity: usize) -> Table {
        let buckets = (0..capacity)
            .map(|_| Bucket {
                head: ArcSwapOption::new(None),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Table { buckets }
    }

    fn bucket_index(&self, hash: u32) -> usize {
        // Capacity is a power of two.
        hash as usize & (self.buckets.len() - 1)
    }
}

struct HashConsingCache {
    table: RwLock<Arc<Table>>,
    count: AtomicUsize,
    cleared: Mutex<Vec<u32>>,
}

static CACHE: Lazy<HashConsingCache> = Lazy::new(|| HashConsingCache {
    table: RwLock::new(Arc::new(Table::with_capacity(MINIMAL_CAPACITY))),
    count: AtomicUsize::new(0),
    cleared: Mutex::new(Vec::new()),
});

/// Returns the canonical instance equal to `kind`, interning a fresh value
/// when nothing equal is currently live.
pub(crate) fn intern(kind: crate::value::ValueKind) -> Value {
    CACHE.intern(Value::from_data(Arc::new(ValueData::new(kind))))
}

/// Called by `ValueData::drop`: records that the entry at `handle` lost its
/// referent and is ready to be unlinked.
pub(crate) fn enqueue_cleared(handle: InternHandle) {
    CACHE.cleared.lock().push(handle.hash);
}

/// Number of live entries currently accounted in the cache.
#[doc(hidden)]
#[must_use]
pub fn interned_count() -> usize {
    CACHE.count.load(Ordering::Relaxed)
}

/// Drains the cleared queue and unlinks dead entries, then adjusts the table
/// capacity. Interning runs the same maintenance on every miss; this hook
/// exists for deterministic reclamation in tests.
#[doc(hidden)]
pub fn collect_cleared() {
    CACHE.cleanup();
    CACHE.resize_if_needed();
}

impl HashConsingCache {
    fn intern(&self, candidate: Value) -> Value {
        let hash = mix(fold_hash(candidate.hash64()));
        'restart: loop {
            let table = self.table.read().clone();
            let bucket = &table.buckets[table.bucket_index(hash)];
            let observed = bucket.head.load_full();
            if let Some(found) = lookup(observed.clone(), None, hash, &candidate) {
                return found;
            }

            // Miss: reclaim dead entries and make room before installing.
            self.cleanup();
            self.resize_if_needed();

            let entry = Arc::new(Entry {
                hash,
                referent: Arc::downgrade(candidate.data()),
                claimed: AtomicBool::new(false),
                next: ArcSwapOption::new(None),
            });
            let mut not_found_in = observed;
            loop {
                // The read lock pins the table while the entry goes in; a
                // committed resize fails the pointer check and restarts the
                // whole operation on the new table.
                let guard = self.table.read();
                if !Arc::ptr_eq(&*guard, &table) {
                    continue 'restart;
                }
                let current = bucket.head.load_full();
                if !link_ptr_eq(&current, &not_found_in) {
                    // The chain grew since the miss was observed. Re-examine
                    // the new segment only, down to the previously observed
                    // head, to catch a concurrent insert of an equal value.
                    if let Some(found) =
                        lookup(current.clone(), not_found_in.as_ref(), hash, &candidate)
                    {
                        return found;
                    }
                    not_found_in = current.clone();
                }
                entry.next.store(current.clone());
                let previous = bucket.head.compare_and_swap(&current, Some(entry.clone()));
                if link_ptr_eq(&previous, &current) {
                    drop(guard);
                    self.count.fetch_add(1, Ordering::Relaxed);
                    // Publish the ticket so the value's drop can notify the
                    // cache.
                    let _ = candidate.data().handle.set(InternHandle { hash });
                    return candidate;
                }
                // The head moved underneath the swap; go around again.
            }
        }
    }

    fn cleanup(&self) {
        let mut drained = {
            let mut queue = self.cleared.lock();
            if queue.is_empty() {
                return;
            }
            std::mem::take(&mut *queue)
        };
        drained.sort_unstable();
        drained.dedup();

        let table = self.table.read();
        for hash in drained {
            let bucket = &table.buckets[table.bucket_index(hash)];
            // Claim and unlink every dead entry currently on this chain.
            let mut cursor = bucket.head.load_full();
            while let Some(entry) = cursor {
                cursor = entry.next.load_full();
                if entry.is_dead() && entry.claim() {
                    unlink(bucket, &entry);
                    self.count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn resize_if_needed(&self) {
        let current_len = self.table.read().buckets.len();
        if target_capacity(current_len, self.count.load(Ordering::Relaxed) + 1) == current_len {
            return;
        }

        let mut guard = self.table.write();
        // Another resize may have won the race; recompute against the table
        // actually installed.
        let old = guard.clone();
        let old_len = old.buckets.len();
        let target = target_capacity(old_len, self.count.load(Ordering::Relaxed) + 1);
        if target == old_len {
            return;
        }

        // Old entries are never touched: lookups that already snapshotted
        // the old table keep walking it. Live entries get fresh wrappers in
        // the new table; dead ones are dropped here, claimed so a queued
        // cleanup does not account for them twice.
        let new_table = Arc::new(Table::with_capacity(target));
        for bucket in old.buckets.iter() {
            let mut cursor = bucket.head.load_full();
            while let Some(entry) = cursor {
                cursor = entry.next.load_full();
                if entry.is_dead() {
                    if entry.claim() {
                        self.count.fetch_sub(1, Ordering::Relaxed);
                    }
                } else {
                    let idx = new_table.bucket_index(entry.hash);
                    let head = new_table.buckets[idx].head.load_full();
                    let rehashed = Arc::new(Entry {
                        hash: entry.hash,
                        referent: entry.referent.clone(),
                        claimed: AtomicBool::new(false),
                        next: ArcSwapOption::new(head),
                    });
                    new_table.buckets[idx].head.store(Some(rehashed));
                }
            }
        }
        *guard = new_table;
    }
}

/// Walks a chain from `start`, stopping at `stop` (exclusive), looking for a
/// live entry structurally equal to the candidate. Wait-free per probe step:
/// every hop is an atomic load.
fn lookup(
    start: Link,
    stop: Option<&Arc<Entry>>,
    hash: u32,
    candidate: &Value,
) -> Option<Value> {
    let mut cursor = start;
    while let Some(entry) = cursor {
        if let Some(stop_entry) = stop {
            if Arc::ptr_eq(&entry, stop_entry) {
                return None;
            }
        }
        if entry.hash == hash {
            if let Some(data) = entry.referent.upgrade() {
                if data.kind == candidate.data().kind {
                    return Some(Value::from_data(data));
                }
            }
        }
        cursor = entry.next.load_full();
    }
    None
}

/// Unlinks a claimed entry: compare-and-swap either the chain head or the
/// predecessor's `next`, restarting the walk when an insertion raced in
/// front or the predecessor itself was removed. The target's own `next`
/// stays intact so walks passing through it still reach the tail.
fn unlink(bucket: &Bucket, target: &Arc<Entry>) {
    loop {
        let mut prev: Link = None;
        let mut cursor = bucket.head.load_full();
        let mut found = false;
        while let Some(entry) = cursor {
            if Arc::ptr_eq(&entry, target) {
                found = true;
                break;
            }
            let next = entry.next.load_full();
            prev = Some(entry);
            cursor = next;
        }
        if !found {
            // Already off this chain.
            return;
        }

        let successor = target.next.load_full();
        let expected = Some(target.clone());
        let swapped = match &prev {
            None => bucket.head.compare_and_swap(&expected, successor),
            Some(predecessor) => predecessor.next.compare_and_swap(&expected, successor),
        };
        if link_ptr_eq(&swapped, &expected) {
            return;
        }
    }
}

fn link_ptr_eq(a: &Link, b: &Link) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

fn target_capacity(len: usize, projected: usize) -> usize {
    let mut target = len;
    if projected * 5 > len * 4 {
        // Beyond 0.8 load: double.
        target = len * 2;
    } else if len > MINIMAL_CAPACITY && projected < len / 4 {
        // Under 0.25 load: shrink to the smallest sufficient power of two.
        target = projected.next_power_of_two();
    }
    target.clamp(MINIMAL_CAPACITY, MAX_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::target_capacity;

    #[test]
    fn growth_and_shrink_thresholds() {
        assert_eq!(target_capacity(16, 10), 16);
        assert_eq!(target_capacity(16, 13), 32, "beyond 0.8 load doubles");
        assert_eq!(target_capacity(1024, 100), 128, "deep shrink snaps to a power of two");
        assert_eq!(target_capacity(16, 1), 16, "never below the minimum");
        assert_eq!(target_capacity(32, 9), 32, "quarter load boundary stays put");
        assert_eq!(target_capacity(32, 7), 16);
    }
}
