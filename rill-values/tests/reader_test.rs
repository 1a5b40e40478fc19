// rill-values - Reader integration tests
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Integration tests for the canonical text reader.
//!
//! Covers every surface form, whitespace insignificance, escapes, the
//! number fallback chain, type-directed reading and the reported error
//! positions.

use rill_values::error::Error;
use rill_values::factory;
use rill_values::parser::{read, read_value};
use rill_values::types::{Type, TypeStore};
use rill_values::value::ValueKind;

/// Assert that `input` parses to the same value as `expected`.
macro_rules! assert_reads {
    ($input:expr, $expected:expr) => {
        let result = read_value($input);
        assert!(
            result.is_ok(),
            "failed to read '{}': {:?}",
            $input,
            result.err()
        );
        assert_eq!(result.unwrap(), $expected, "reading '{}'", $input);
    };
}

// =============================================================================
// Primitives
// =============================================================================

#[test]
fn booleans() {
    assert_reads!("true", factory::boolean(true));
    assert_reads!("false", factory::boolean(false));
}

#[test]
fn integers() {
    assert_reads!("0", factory::integer(0));
    assert_reads!("42", factory::integer(42));
    assert_reads!("-6", factory::integer(-6));
    assert_reads!(
        "123456789012345678901234567890",
        factory::integer_from_str("123456789012345678901234567890").unwrap()
    );
}

#[test]
fn rationals() {
    assert_reads!("1r2", factory::rational(1.into(), 2.into()).unwrap());
    assert_reads!("-3r4", factory::rational((-3).into(), 4.into()).unwrap());
    // An omitted denominator defaults to one.
    assert_reads!("7r", factory::rational(7.into(), 1.into()).unwrap());
    // Rationals normalise on construction.
    assert_reads!("2r4", factory::rational(1.into(), 2.into()).unwrap());
}

#[test]
fn reals() {
    assert_reads!("4.875329280939582", factory::real_from_str("4.875329280939582").unwrap());
    assert_reads!("-0.5", factory::real_from_str("-0.5").unwrap());
    assert_reads!("1e3", factory::real_from_str("1e3").unwrap());
    assert_reads!("2.5E-4", factory::real_from_str("2.5E-4").unwrap());
}

#[test]
fn strings_and_escapes() {
    assert_reads!("\"\"", factory::string(""));
    assert_reads!("\"hello\"", factory::string("hello"));
    assert_reads!(r#""a\nb\tc""#, factory::string("a\nb\tc"));
    assert_reads!(r#""q\"q""#, factory::string("q\"q"));
    assert_reads!(r#""back\\slash""#, factory::string("back\\slash"));
    assert_reads!(r#""\<angles\>""#, factory::string("<angles>"));
    assert_reads!(r#""\a0A""#, factory::string("\n"));
    assert_reads!(r#""A""#, factory::string("A"));
    assert_reads!(r#""\U01F600""#, factory::string("\u{1F600}"));
    assert_reads!("\"햿ŏŤD\"", factory::string("햿ŏŤD"));
}

#[test]
fn whitespace_is_insignificant_outside_strings() {
    assert_reads!(
        " [ 1 , 2 , 3 ] ",
        factory::list(vec![
            factory::integer(1),
            factory::integer(2),
            factory::integer(3)
        ])
    );
    // ... but preserved inside strings.
    assert_reads!("\"a b\"", factory::string("a b"));
}

// =============================================================================
// Datetimes
// =============================================================================

#[test]
fn dates_times_and_instants() {
    assert_reads!("$2020-10-26$", factory::date(2020, 10, 26).unwrap());
    assert_reads!(
        "$T18:36:56.342+00:00$",
        factory::time(18, 36, 56, 342, 0, 0).unwrap()
    );
    assert_reads!(
        "$2020-10-26T18:36:56.342+00:00$",
        factory::datetime(2020, 10, 26, 18, 36, 56, 342, 0, 0).unwrap()
    );
    assert_reads!(
        "$6404-03-11T09:37:06.202+00:00$",
        factory::datetime(6404, 3, 11, 9, 37, 6, 202, 0, 0).unwrap()
    );
}

#[test]
fn timezone_offsets() {
    assert_reads!(
        "$T01:02:03.004+05:30$",
        factory::time(1, 2, 3, 4, 5, 30).unwrap()
    );
    // The ':' between offset hours and minutes is optional on input.
    assert_reads!(
        "$T01:02:03.004+0530$",
        factory::time(1, 2, 3, 4, 5, 30).unwrap()
    );
    assert_reads!(
        "$T01:02:03.004-08:00$",
        factory::time(1, 2, 3, 4, -8, 0).unwrap()
    );
}

// =============================================================================
// Source locations
// =============================================================================

#[test]
fn source_locations() {
    assert_reads!("|file:///tmp/x|", factory::source_location("file:///tmp/x").unwrap());
    assert_reads!(
        "|file:///tmp/x|(10,4)",
        factory::source_location_with_range("file:///tmp/x", 10, 4).unwrap()
    );
    assert_reads!(
        "|file:///tmp/x|(10,4,<2,1>,<3,7>)",
        factory::source_location_with_positions("file:///tmp/x", 10, 4, 2, 1, 3, 7).unwrap()
    );
}

#[test]
fn negative_source_location_offset_is_a_domain_error() {
    let result = read_value("|file:///tmp/x|(-1,4)");
    assert!(matches!(result, Err(Error::Domain { .. })), "{:?}", result);
}

#[test]
fn source_location_argument_counts() {
    let result = read_value("|file:///tmp/x|(1,2,3)");
    assert!(result.is_err());
}

// =============================================================================
// Containers
// =============================================================================

#[test]
fn lists_sets_tuples_maps() {
    assert_reads!("[]", factory::list(vec![]));
    assert_reads!("{}", factory::set(vec![]));
    assert_reads!("<>", factory::tuple(vec![]));
    assert_reads!("()", factory::map(vec![]));

    assert_reads!(
        "{1,2,2,3}",
        factory::set(vec![
            factory::integer(1),
            factory::integer(2),
            factory::integer(3)
        ])
    );
    assert_reads!(
        "<1,\"a\">",
        factory::tuple(vec![factory::integer(1), factory::string("a")])
    );
    assert_reads!(
        "(1:\"a\",2:\"b\")",
        factory::map(vec![
            (factory::integer(1), factory::string("a")),
            (factory::integer(2), factory::string("b"))
        ])
    );
}

#[test]
fn trailing_commas_are_tolerated() {
    assert_reads!("[1,2,]", factory::list(vec![factory::integer(1), factory::integer(2)]));
}

#[test]
fn nested_containers() {
    assert_reads!(
        "[[1],[2,3],[]]",
        factory::list(vec![
            factory::list(vec![factory::integer(1)]),
            factory::list(vec![factory::integer(2), factory::integer(3)]),
            factory::list(vec![]),
        ])
    );
}

// =============================================================================
// Nodes and keyword parameters
// =============================================================================

#[test]
fn plain_nodes() {
    assert_reads!("f()", factory::node("f", vec![], vec![]));
    assert_reads!(
        "f(1,2)",
        factory::node("f", vec![factory::integer(1), factory::integer(2)], vec![])
    );
}

#[test]
fn quoted_node_names() {
    assert_reads!(
        "\"59\"(false,-6)",
        factory::node(
            "59",
            vec![factory::boolean(false), factory::integer(-6)],
            vec![]
        )
    );
}

#[test]
fn inline_keyword_parameters() {
    assert_reads!(
        "f(1,x=2)",
        factory::node(
            "f",
            vec![factory::integer(1)],
            vec![("x".to_string(), factory::integer(2))]
        )
    );
}

#[test]
fn legacy_annotation_block_becomes_keyword_parameters() {
    assert_reads!(
        "f(1)[@x=2, @y=\"z\"]",
        factory::node(
            "f",
            vec![factory::integer(1)],
            vec![
                ("x".to_string(), factory::integer(2)),
                ("y".to_string(), factory::string("z"))
            ]
        )
    );
}

#[test]
fn annotation_block_on_a_non_node_is_an_error() {
    assert!(read_value("[1][@x=2]").is_err());
}

#[test]
fn bare_identifier_is_an_error() {
    assert!(read_value("frobnicate").is_err());
}

// =============================================================================
// Type-directed reading
// =============================================================================

#[test]
fn expected_type_is_enforced() {
    let store = TypeStore::new();
    assert!(read("1", &Type::Integer, &store).is_ok());
    assert!(read("[1,2]", &Type::list(Type::Integer), &store).is_ok());

    let result = read("\"x\"", &Type::Integer, &store);
    assert!(matches!(result, Err(Error::Type { .. })), "{:?}", result);

    let result = read("[1,\"x\"]", &Type::list(Type::Integer), &store);
    assert!(matches!(result, Err(Error::Type { .. })), "{:?}", result);
}

#[test]
fn constructors_resolve_against_the_store() {
    let mut store = TypeStore::new();
    let expr = store.declare_adt("Expr");
    store
        .declare_constructor("Expr", "lit", vec![Type::Integer])
        .unwrap();

    let value = read("lit(3)", &expr, &store).unwrap();
    let ValueKind::Constructor(c) = value.kind() else {
        panic!("expected a constructor, got {:?}", value);
    };
    assert_eq!(c.name(), "lit");
    assert_eq!(c.children(), &[factory::integer(3)]);
    assert!(value.type_of().is_subtype_of(&expr));
}

#[test]
fn constructors_resolve_by_shape_when_untyped() {
    let mut store = TypeStore::new();
    store.declare_adt("Expr");
    store
        .declare_constructor("Expr", "lit", vec![Type::Integer])
        .unwrap();

    // Against the top type the reader resolves by name and argument shape.
    let value = read("lit(3)", &Type::Value, &store).unwrap();
    assert!(matches!(value.kind(), ValueKind::Constructor(_)));

    // A name the store does not know stays an untyped node.
    let value = read("mystery(3)", &Type::Value, &store).unwrap();
    assert!(matches!(value.kind(), ValueKind::Node(_)));
}

#[test]
fn ill_typed_constructor_child_is_an_error() {
    let mut store = TypeStore::new();
    let expr = store.declare_adt("Expr");
    store
        .declare_constructor("Expr", "lit", vec![Type::Integer])
        .unwrap();

    let result = read("lit(\"x\")", &expr, &store);
    assert!(matches!(result, Err(Error::Type { .. })), "{:?}", result);
}

#[test]
fn ambiguous_constructor_is_an_overload_error() {
    let mut store = TypeStore::new();
    let expr = store.declare_adt("Expr");
    store
        .declare_constructor("Expr", "lit", vec![Type::Integer])
        .unwrap();
    store
        .declare_constructor("Expr", "lit", vec![Type::Real])
        .unwrap();

    let result = read("lit(3)", &expr, &store);
    assert!(matches!(result, Err(Error::Overload { .. })), "{:?}", result);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn malformed_inputs_report_offsets() {
    for input in ["", "[1,2", "(1:2", "\"open", "$2020-13$", "1r2r3", "@", "<1,2"] {
        match read_value(input) {
            Err(Error::Parse { .. }) | Err(Error::Domain { .. }) => {}
            other => panic!("expected a parse failure for '{}', got {:?}", input, other),
        }
    }
}

#[test]
fn trailing_input_is_an_error() {
    assert!(read_value("1 x").is_err());
    assert!(read_value("[] []").is_err());
}

#[test]
fn digits_glue_across_insignificant_whitespace() {
    // Whitespace is stripped before tokenisation, so split digits form one
    // number.
    assert_reads!("1 2", factory::integer(12));
}

#[test]
fn number_fallback_chain() {
    // 'r' forces the rational fallback after integer and real parsing fail.
    let value = read_value("10r4").unwrap();
    assert_eq!(value, factory::rational(5.into(), 2.into()).unwrap());
}

// =============================================================================
// Seed scenario S6
// =============================================================================

#[test]
fn two_independent_reads_agree() {
    let source = "(|Da:///7w|:\"y\"(4.875329280939582,false,$2020-02-19T01:25:19.036+00:00$))";
    let first = read_value(source).unwrap();
    let second = read_value(source).unwrap();
    assert_eq!(first, second);
    assert!(first.is_equal(&second));
    assert_eq!(first.to_canonical_string(), second.to_canonical_string());
}
