// rill-values - Map and set integration tests over values
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Value-keyed maps and sets: persistent updates, transient writers, typed
//! writer errors and the cached size/hash bookkeeping.

use rill_values::error::Error;
use rill_values::factory::{self, ListWriter, MapWriter, SetWriter};
use rill_values::types::Type;
use rill_values::value::{Value, ValueKind, ValueMap, ValueSet};

fn int(i: i64) -> Value {
    factory::integer(i)
}

fn s(text: &str) -> Value {
    factory::string(text)
}

// =============================================================================
// Persistent maps over values
// =============================================================================

#[test]
fn map_of_values_basics() {
    let mut map = ValueMap::new();
    for i in 0..100 {
        map = map.insert(int(i), s(&format!("v{}", i)));
    }
    assert_eq!(map.len(), 100);
    assert_eq!(map.get(&int(40)), Some(&s("v40")));
    assert!(!map.contains_key(&int(100)));
    assert!(map.satisfies_invariants());

    let without = map.remove(&int(40));
    assert_eq!(without.len(), 99);
    assert_eq!(without.get(&int(40)), None);
    assert_eq!(map.len(), 100, "persistent source unchanged");
}

#[test]
fn mixed_key_kinds() {
    let mut map = ValueMap::new();
    map = map.insert(int(1), s("int"));
    map = map.insert(s("1"), s("string"));
    map = map.insert(factory::boolean(true), s("bool"));
    map = map.insert(
        factory::list(vec![int(1)]),
        s("list"),
    );
    assert_eq!(map.len(), 4, "values of distinct kinds never collide");
    assert_eq!(map.get(&int(1)), Some(&s("int")));
    assert_eq!(map.get(&s("1")), Some(&s("string")));
    assert_eq!(map.get(&factory::list(vec![int(1)])), Some(&s("list")));
}

#[test]
fn equal_maps_share_cached_hash() {
    let forward: ValueMap = (0..50).map(|i| (int(i), int(i * i))).collect();
    let backward: ValueMap = (0..50).rev().map(|i| (int(i), int(i * i))).collect();
    assert_eq!(forward, backward);
    assert_eq!(forward.cumulative_hash(), backward.cumulative_hash());
}

#[test]
fn cached_caches_are_exact_for_values() {
    let map: ValueMap = (0..200).map(|i| (int(i * 3), s("x"))).collect();
    assert_eq!(map.len(), map.iter().count());
    assert!(map.satisfies_invariants());

    let set: ValueSet = (0..200).map(int).collect();
    assert_eq!(set.len(), set.iter().count());
    assert!(set.satisfies_invariants());
}

// =============================================================================
// Writers
// =============================================================================

#[test]
fn list_writer_appends_and_inserts() {
    let mut writer = ListWriter::new();
    writer.append(int(2)).unwrap();
    writer.append(int(3)).unwrap();
    writer.insert(int(1)).unwrap();
    let value = writer.done().unwrap();
    assert_eq!(
        value,
        factory::list(vec![int(1), int(2), int(3)])
    );
}

#[test]
fn set_writer_collapses_duplicates() {
    let mut writer = SetWriter::new();
    for i in [1, 2, 2, 3, 3, 3] {
        writer.insert(int(i)).unwrap();
    }
    let value = writer.done().unwrap();
    let ValueKind::Set(set) = value.kind() else {
        panic!("expected a set");
    };
    assert_eq!(set.len(), 3);
}

#[test]
fn map_writer_last_binding_wins() {
    let mut writer = MapWriter::new();
    writer.put(int(1), s("old")).unwrap();
    writer.put(int(1), s("new")).unwrap();
    let value = writer.done().unwrap();
    let ValueKind::Map(map) = value.kind() else {
        panic!("expected a map");
    };
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&int(1)), Some(&s("new")));
}

#[test]
fn frozen_writers_reject_further_writes() {
    let mut writer = ListWriter::new();
    writer.append(int(1)).unwrap();
    writer.done().unwrap();
    assert!(matches!(
        writer.append(int(2)),
        Err(Error::UnsupportedOperation(_))
    ));
    assert!(matches!(writer.done(), Err(Error::UnsupportedOperation(_))));

    let mut writer = MapWriter::new();
    writer.done().unwrap();
    assert!(matches!(
        writer.put(int(1), int(2)),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn typed_map_writer_enforces_declared_types() {
    let mut writer = MapWriter::with_types(Type::Integer, Type::String);
    writer.put(int(1), s("ok")).unwrap();

    let result = writer.put(s("not-an-int"), s("v"));
    assert!(matches!(result, Err(Error::KeyType { .. })), "{:?}", result);

    let result = writer.put(int(2), int(3));
    assert!(
        matches!(result, Err(Error::ValueType { .. })),
        "{:?}",
        result
    );

    // Subtypes of the declared types pass.
    let mut writer = MapWriter::with_types(Type::Number, Type::Value);
    writer.put(int(1), s("anything")).unwrap();
    writer
        .put(factory::rational(1.into(), 2.into()).unwrap(), int(2))
        .unwrap();
}

// =============================================================================
// Dynamic types of literals
// =============================================================================

#[test]
fn container_types_follow_element_lubs() {
    let ints = factory::list(vec![int(1), int(2)]);
    assert_eq!(ints.type_of(), Type::list(Type::Integer));

    let mixed_numbers = factory::list(vec![int(1), factory::real_from_str("0.5").unwrap()]);
    assert_eq!(mixed_numbers.type_of(), Type::list(Type::Number));

    let empty = factory::list(vec![]);
    assert_eq!(empty.type_of(), Type::list(Type::Void));
    assert!(empty.type_of().is_subtype_of(&Type::list(Type::Integer)));
}

#[test]
fn literal_tuples_carry_no_field_names() {
    let tuple = factory::tuple(vec![int(1), s("x")]);
    assert!(!tuple.type_of().has_field_names());

    let map = factory::map([(int(1), s("x"))]);
    assert!(!map.type_of().has_field_names());
}
