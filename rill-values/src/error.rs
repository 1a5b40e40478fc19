// rill-values - Error types for value construction and reading
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Error types for the Rill value library.
//!
//! # Examples
//!
//! ```
//! use rill_values::{Error, Result};
//!
//! let arity_err = Error::arity("cons", 2, 3);
//! assert!(arity_err.to_string().contains("cons"));
//! assert!(arity_err.to_string().contains("expected 2"));
//!
//! let parse_err = Error::parse(17, "unexpected ']'");
//! assert!(parse_err.to_string().contains("offset 17"));
//! ```

use std::fmt;

use crate::types::Type;

/// Result type for value construction and reading.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the value factory, the container writers and the
/// canonical text reader.
///
/// All errors are reported synchronously at the call site of the offending
/// operation; nothing is recovered silently inside the library.
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed canonical text, with the character offset of the failure
    Parse { offset: usize, message: String },
    /// A value does not conform to the expected type
    Type { expected: String, actual: String },
    /// Wrong number of positional children for a constructor
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    /// A constructor name resolves to more than one declaration
    Overload { name: String, candidates: usize },
    /// A constructor name resolves to no declaration at all
    UndeclaredConstructor(String),
    /// A domain precondition failed (negative offset, zero denominator, ...)
    Domain { what: &'static str, value: String },
    /// A map writer with a declared type was given an ill-typed key
    KeyType { expected: String, actual: String },
    /// A map writer with a declared type was given an ill-typed value
    ValueType { expected: String, actual: String },
    /// Writing through a transient that has already been frozen
    UnsupportedOperation(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { offset, message } => {
                write!(f, "Parse error at offset {}: {}", offset, message)
            }
            Error::Type { expected, actual } => {
                write!(f, "Type error: expected {}, got {}", expected, actual)
            }
            Error::Arity {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Wrong number of children for '{}': expected {}, got {}",
                    name, expected, got
                )
            }
            Error::Overload { name, candidates } => {
                write!(
                    f,
                    "Constructor '{}' is ambiguous: {} candidates",
                    name, candidates
                )
            }
            Error::UndeclaredConstructor(name) => {
                write!(f, "Undeclared constructor: {}", name)
            }
            Error::Domain { what, value } => {
                write!(f, "Invalid {}: {}", what, value)
            }
            Error::KeyType { expected, actual } => {
                write!(f, "Map key type error: expected {}, got {}", expected, actual)
            }
            Error::ValueType { expected, actual } => {
                write!(
                    f,
                    "Map value type error: expected {}, got {}",
                    expected, actual
                )
            }
            Error::UnsupportedOperation(what) => {
                write!(f, "Unsupported operation: {}", what)
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a parse error at a character offset.
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Create a type error from the expected and actual types.
    pub fn type_mismatch(expected: &Type, actual: &Type) -> Self {
        Error::Type {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an arity error for a named constructor.
    pub fn arity(name: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            expected,
            got,
        }
    }

    /// Create an overload error for an ambiguous constructor name.
    pub fn overload(name: impl Into<String>, candidates: usize) -> Self {
        Error::Overload {
            name: name.into(),
            candidates,
        }
    }

    /// Create a domain error for a failed precondition.
    pub fn domain(what: &'static str, value: impl fmt::Display) -> Self {
        Error::Domain {
            what,
            value: value.to_string(),
        }
    }

    /// Create a key type error for a typed map writer.
    pub fn key_type(expected: &Type, actual: &Type) -> Self {
        Error::KeyType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a value type error for a typed map writer.
    pub fn value_type(expected: &Type, actual: &Type) -> Self {
        Error::ValueType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
