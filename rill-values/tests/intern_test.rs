// rill-values - Hash-consing cache integration tests
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Behaviour of the global weak hash-consing cache: canonical identity,
//! reclamation after the last strong reference dies, and survival through
//! table resizes.

use rill_values::factory;
use rill_values::intern::{collect_cleared, interned_count};
use rill_values::value::Value;

/// Equal factory calls return one physical instance.
#[test]
fn equal_values_share_one_representation() {
    let a = factory::string("shared-representation");
    let b = factory::string("shared-representation");
    assert!(Value::ptr_eq(&a, &b));
    assert_eq!(a, b);

    let c = factory::list(vec![factory::integer(1), factory::integer(2)]);
    let d = factory::list(vec![factory::integer(1), factory::integer(2)]);
    assert!(Value::ptr_eq(&c, &d));
}

/// Distinct values keep distinct representations.
#[test]
fn distinct_values_stay_distinct() {
    let a = factory::string("one-of-a-kind-1");
    let b = factory::string("one-of-a-kind-2");
    assert!(!Value::ptr_eq(&a, &b));
    assert_ne!(a, b);
}

/// An instance stays canonical while an older equal instance is live.
#[test]
fn older_reference_wins() {
    let first = factory::integer(778_899_001);
    let second = factory::integer(778_899_001);
    let third = factory::integer(778_899_001);
    assert!(Value::ptr_eq(&first, &second));
    assert!(Value::ptr_eq(&first, &third));
}

/// S3: a large intern run keeps identity for the whole key space, and the
/// entries are reclaimable once the values die.
#[test]
fn large_intern_run_and_reclamation() {
    const N: i64 = 1 << 20;
    const BASE: i64 = 40_000_000_000;

    let before = interned_count();

    let first: Vec<Value> = (0..N).map(|i| factory::integer(BASE + i)).collect();
    // The same keys again: every intern must come back pointer-identical.
    let again: Vec<Value> = (0..N).map(|i| factory::integer(BASE + i)).collect();
    for (a, b) in first.iter().zip(&again) {
        assert!(Value::ptr_eq(a, b));
    }
    assert!(Value::ptr_eq(&again[(N - 1) as usize], &first[(N - 1) as usize]));

    // Other tests in this binary may churn the cache concurrently; the
    // margins below stay far away from their volumes.
    let peak = interned_count();
    assert!(
        peak + 20_000 >= before + N as usize,
        "peak {} does not cover the {} interned keys",
        peak,
        N
    );

    drop(first);
    drop(again);
    collect_cleared();

    let after = interned_count();
    assert!(
        after + (N as usize) <= peak + (N as usize / 50),
        "reclamation left too many entries: before {}, peak {}, after {}",
        before,
        peak,
        after
    );

    // Interning a dropped key again yields a live canonical instance.
    let revived = factory::integer(BASE);
    assert_eq!(revived, factory::integer(BASE));
    assert!(Value::ptr_eq(&revived, &factory::integer(BASE)));
}

/// Dead entries for one hash class do not take live neighbours with them.
#[test]
fn reclamation_spares_live_values() {
    let keeper = factory::string("keeper-survives-cleanup");
    for i in 0..10_000 {
        let transient = factory::string(format!("cleanup-fodder-{}", i));
        drop(transient);
    }
    collect_cleared();
    assert!(Value::ptr_eq(
        &keeper,
        &factory::string("keeper-survives-cleanup")
    ));
}

/// Containers and terms intern structurally: same content, same pointer.
#[test]
fn structural_interning_of_composites() {
    let a = factory::node(
        "pair",
        vec![
            factory::map([(factory::integer(1), factory::string("x"))]),
            factory::set((0..8).map(factory::integer)),
        ],
        vec![("w".to_string(), factory::boolean(true))],
    );
    let b = factory::node(
        "pair",
        vec![
            factory::map([(factory::integer(1), factory::string("x"))]),
            factory::set((0..8).rev().map(factory::integer)),
        ],
        vec![("w".to_string(), factory::boolean(true))],
    );
    assert!(Value::ptr_eq(&a, &b));
}
