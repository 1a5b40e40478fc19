// rill-values - Factory integration tests
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! The factory surface: domain preconditions, the process-wide real
//! precision, and constructor checking.

use rill_values::error::Error;
use rill_values::factory::{self, real_precision, set_real_precision};
use rill_values::parser::read;
use rill_values::types::{Type, TypeStore};
use rill_values::value::ValueKind;

// =============================================================================
// Domain preconditions
// =============================================================================

#[test]
fn zero_denominator_is_a_domain_error() {
    let result = factory::rational(1.into(), 0.into());
    assert!(matches!(result, Err(Error::Domain { .. })), "{:?}", result);
}

#[test]
fn impossible_dates_are_domain_errors() {
    assert!(factory::date(2021, 2, 29).is_err());
    assert!(factory::date(2020, 13, 1).is_err());
    assert!(factory::date(-44, 3, 15).is_err(), "years before 0 do not print");
    assert!(factory::date(10_000, 1, 1).is_err());
    assert!(factory::date(2020, 2, 29).is_ok(), "leap day");
}

#[test]
fn inconsistent_timezone_offsets_are_domain_errors() {
    assert!(factory::time(1, 0, 0, 0, 5, -30).is_err(), "mixed signs");
    assert!(factory::time(1, 0, 0, 0, 24, 0).is_err());
    assert!(factory::time(1, 0, 0, 0, -5, -30).is_ok());
}

#[test]
fn source_location_preconditions() {
    assert!(factory::source_location_with_range("file:///x", -1, 0).is_err());
    assert!(factory::source_location_with_range("file:///x", 0, -1).is_err());
    assert!(
        factory::source_location_with_positions("file:///x", 0, 1, 4, 0, 2, 0).is_err(),
        "end line before begin line"
    );
    assert!(
        factory::source_location_with_positions("file:///x", 0, 1, 2, 9, 2, 3).is_err(),
        "end column before begin column on one line"
    );
    assert!(factory::source_location_with_positions("file:///x", 0, 1, 2, 3, 2, 3).is_ok());
}

#[test]
fn malformed_uris_are_rejected() {
    assert!(factory::source_location("no-scheme").is_err());
    assert!(factory::source_location("1bad://x").is_err());
    assert!(factory::source_location("has space://x").is_err());
    assert!(factory::source_location("file:///good").is_ok());
}

#[test]
fn nan_and_infinity_never_become_reals() {
    assert!(factory::real(f64::NAN).is_err());
    assert!(factory::real(f64::INFINITY).is_err());
    assert!(factory::real(0.25).is_ok());
}

// =============================================================================
// Real precision
// =============================================================================

#[test]
fn real_precision_is_settable_and_restorable() {
    let previous = set_real_precision(4);
    assert_eq!(real_precision(), 4);

    let rounded = factory::real(1.0 / 3.0).unwrap();
    let printed = rounded.to_canonical_string();
    assert_eq!(printed, "0.3333", "rounded to four significant digits");

    // Per-call precision overrides the global setting.
    let finer = factory::real_with_precision(1.0 / 3.0, 8).unwrap();
    assert_eq!(finer.to_canonical_string(), "0.33333333");

    // Literal digits are never rounded away.
    let literal = factory::real_from_str("0.123456789123").unwrap();
    assert_eq!(literal.to_canonical_string(), "0.123456789123");

    set_real_precision(previous);
    assert_eq!(real_precision(), previous);
}

// =============================================================================
// Constructors
// =============================================================================

fn arithmetic_store() -> (TypeStore, Type) {
    let mut store = TypeStore::new();
    let expr = store.declare_adt("Expr");
    store
        .declare_constructor("Expr", "lit", vec![Type::Integer])
        .unwrap();
    store
        .declare_constructor_full(
            "Expr",
            "tagged",
            vec![Type::Integer],
            None,
            vec![("origin".to_string(), Type::SourceLocation)],
        )
        .unwrap();
    (store, expr)
}

#[test]
fn constructor_arity_is_checked() {
    let (store, expr) = arithmetic_store();
    let result = read("lit(1,2)", &expr, &store);
    assert!(matches!(result, Err(Error::Arity { .. })), "{:?}", result);
    assert!(read("lit(1)", &expr, &store).is_ok());
}

#[test]
fn declared_keyword_parameters_are_typed() {
    let (store, expr) = arithmetic_store();

    let ok = read("tagged(1,origin=|file:///a|)", &expr, &store);
    assert!(ok.is_ok(), "{:?}", ok.err());

    let bad = read("tagged(1,origin=99)", &expr, &store);
    assert!(matches!(bad, Err(Error::Type { .. })), "{:?}", bad);

    // Undeclared keyword parameters stay untyped and pass.
    let free = read("tagged(1,note=99)", &expr, &store);
    assert!(free.is_ok(), "{:?}", free.err());
}

#[test]
fn constructor_children_are_interned_terms() {
    let (store, expr) = arithmetic_store();
    let a = read("lit(7)", &expr, &store).unwrap();
    let b = read("lit(7)", &expr, &store).unwrap();
    assert!(rill_values::Value::ptr_eq(&a, &b));

    let ValueKind::Constructor(c) = a.kind() else {
        panic!("expected a constructor");
    };
    assert_eq!(c.constructor_type().name, "lit");
}
