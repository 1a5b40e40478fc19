// rill-values - Concurrency tests for the hash-consing cache
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Concurrent behaviour of the intern cache: canonical identity across
//! racing threads, and stability of live entries under resize pressure.

use std::sync::Arc;
use std::thread;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use rill_values::factory;
use rill_values::intern::collect_cleared;
use rill_values::value::Value;

/// S4: eight threads intern the same shuffled candidate space; every thread
/// must see pointer-identical canonical instances.
#[test]
fn concurrent_interning_is_stable() {
    const THREADS: usize = 8;
    const KEYS: i64 = 1 << 16;
    const BASE: i64 = 90_000_000_000;

    let handles: Vec<_> = (0..THREADS)
        .map(|seed| {
            thread::spawn(move || {
                let mut order: Vec<i64> = (0..KEYS).collect();
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed as u64);
                order.shuffle(&mut rng);

                let mut seen: Vec<Option<Value>> = vec![None; KEYS as usize];
                for i in order {
                    let value = factory::integer(BASE + i);
                    // Interning the same candidate again mid-run must agree.
                    assert!(Value::ptr_eq(&value, &factory::integer(BASE + i)));
                    seen[i as usize] = Some(value);
                }
                seen.into_iter().map(Option::unwrap).collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<Vec<Value>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker thread panicked"))
        .collect();

    let reference = &results[0];
    for other in &results[1..] {
        for (a, b) in reference.iter().zip(other) {
            assert!(
                Value::ptr_eq(a, b),
                "two threads observed distinct canonical instances"
            );
        }
    }
}

/// Property 11: values held strongly stay retrievable while a churn thread
/// forces the table through grows, shrinks and cleanups.
#[test]
fn live_entries_survive_resizes() {
    const STABLE: i64 = 1_000;
    const CHURN: i64 = 50_000;
    const BASE: i64 = 70_000_000_000;

    let stable: Arc<Vec<Value>> = Arc::new(
        (0..STABLE)
            .map(|i| factory::integer(BASE + i))
            .collect(),
    );

    let churner = thread::spawn(move || {
        for round in 0..5 {
            let bulk: Vec<Value> = (0..CHURN)
                .map(|i| factory::string(format!("churn-{}-{}", round, i)))
                .collect();
            drop(bulk);
            collect_cleared();
        }
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let stable = Arc::clone(&stable);
            thread::spawn(move || {
                for _ in 0..50 {
                    for (i, held) in stable.iter().enumerate() {
                        let found = factory::integer(BASE + i as i64);
                        assert!(
                            Value::ptr_eq(held, &found),
                            "a strongly held value lost its canonical identity"
                        );
                    }
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
    churner.join().expect("churn thread panicked");
}

/// Racing inserts of one fresh key settle on a single canonical instance.
#[test]
fn racing_first_inserts_agree() {
    for round in 0..200 {
        let key = format!("race-{}", round);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let key = key.clone();
                thread::spawn(move || factory::string(key))
            })
            .collect();
        let values: Vec<Value> = handles
            .into_iter()
            .map(|handle| handle.join().expect("racer panicked"))
            .collect();
        for value in &values[1..] {
            assert!(Value::ptr_eq(&values[0], value));
        }
    }
}
