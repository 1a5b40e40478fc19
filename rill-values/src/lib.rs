// rill-values - Immutable, hash-consed first-class values for Rill
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! # rill-values
//!
//! The data foundation of the Rill term-rewriting language: immutable,
//! structurally-shared, hash-consed first-class values.
//!
//! Values cover primitives (arbitrary-precision integers, rationals,
//! decimal reals, booleans, strings, datetimes, source locations),
//! containers (list, set, map, tuple) and term-structured values (nodes and
//! typed constructors with positional and keyword children). Values compare
//! by structural equality, hash consistently with equality, and round-trip
//! losslessly through the canonical textual form:
//!
//! ```
//! use rill_values::{factory, parser};
//!
//! let parsed = parser::read_value("(2:\"b\")").unwrap();
//! let built = factory::map([(factory::integer(2), factory::string("b"))]);
//! assert_eq!(parsed, built);
//! assert_eq!(built.to_canonical_string(), "(2:\"b\")");
//! ```
//!
//! Maps and sets sit on a canonical CHAMP trie with exact incremental size
//! and hash caches; batch construction goes through single-writer
//! transients. Every factory result is globally de-duplicated through a
//! concurrent weak hash-consing cache, so structural equality of canonical
//! instances collapses to pointer identity while unreachable values stay
//! reclaimable.

pub mod error;
pub mod factory;
pub mod intern;
pub mod lexer;
pub mod map;
mod node;
pub mod parser;
pub mod set;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use map::{TransientTrieMap, TrieMap};
pub use parser::{read, read_value};
pub use set::{TransientTrieSet, TrieSet};
pub use types::{Type, TypeStore};
pub use value::{
    DateTimeValue, KeywordParams, SourceLocation, Value, ValueKind, ValueMap, ValueSet,
    ValueVisitor,
};
