// rill-values - Value factory, container writers, precision setting
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Construction of values.
//!
//! Every factory function routes its result through the hash-consing cache,
//! so structurally equal results share one physical representation. The
//! container writers are transient-backed builders; a map writer may carry a
//! declared type, in which case ill-typed puts are rejected.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::intern;
use crate::map::{frozen_result, TransientTrieMap};
use crate::set::TransientTrieSet;
use crate::types::{ConstructorType, Type};
use crate::value::{
    ConstructorValue, DateTimeValue, KeywordParams, LineColumnRange, NodeValue, Range,
    SourceLocation, Value, ValueKind, ValueMap, ValueSet,
};

// ============================================================================
// Real precision
// ============================================================================

/// Default number of significant decimal digits for reals built from
/// machine floats.
const DEFAULT_REAL_PRECISION: u32 = 10;

static REAL_PRECISION: AtomicU32 = AtomicU32::new(DEFAULT_REAL_PRECISION);

/// The process-wide real precision, in significant decimal digits.
#[must_use]
pub fn real_precision() -> u32 {
    REAL_PRECISION.load(Ordering::Relaxed)
}

/// Sets the process-wide real precision. Returns the previous setting.
pub fn set_real_precision(precision: u32) -> u32 {
    REAL_PRECISION.swap(precision.max(1), Ordering::Relaxed)
}

// ============================================================================
// Primitives
// ============================================================================

/// A boolean value.
#[must_use]
pub fn boolean(value: bool) -> Value {
    intern::intern(ValueKind::Boolean(value))
}

/// An integer value from a machine integer.
#[must_use]
pub fn integer(value: i64) -> Value {
    intern::intern(ValueKind::Integer(BigInt::from(value)))
}

/// An integer value from an arbitrary-precision integer.
#[must_use]
pub fn integer_from(value: BigInt) -> Value {
    intern::intern(ValueKind::Integer(value))
}

/// An integer value from its decimal notation.
pub fn integer_from_str(literal: &str) -> Result<Value> {
    let value =
        BigInt::from_str(literal).map_err(|_| Error::domain("integer literal", literal))?;
    Ok(integer_from(value))
}

/// A rational value; the fraction is normalised and the denominator kept
/// positive. A zero denominator is a domain error.
pub fn rational(numerator: BigInt, denominator: BigInt) -> Result<Value> {
    if denominator.is_zero() {
        return Err(Error::domain("rational denominator", 0));
    }
    Ok(intern::intern(ValueKind::Rational(BigRational::new(
        numerator,
        denominator,
    ))))
}

/// A rational value from its `NrD` notation; the denominator may be omitted
/// and defaults to one.
pub fn rational_from_str(literal: &str) -> Result<Value> {
    let (numer, denom) = match literal.split_once('r') {
        Some((n, "")) => (n, "1"),
        Some((n, d)) => (n, d),
        None => (literal, "1"),
    };
    let numer = BigInt::from_str(numer).map_err(|_| Error::domain("rational literal", literal))?;
    let denom = BigInt::from_str(denom).map_err(|_| Error::domain("rational literal", literal))?;
    rational(numer, denom)
}

/// A real value from its decimal notation, keeping the literal's digits.
///
/// Accepts the reader's full surface, including the bare `.5` and `5.`
/// forms.
pub fn real_from_str(literal: &str) -> Result<Value> {
    let mut normalised = std::borrow::Cow::Borrowed(literal);
    if let Some(rest) = literal.strip_prefix('.') {
        normalised = std::borrow::Cow::Owned(format!("0.{}", rest));
    } else if let Some(rest) = literal.strip_prefix("-.") {
        normalised = std::borrow::Cow::Owned(format!("-0.{}", rest));
    }
    if normalised.ends_with('.') {
        normalised = std::borrow::Cow::Owned(format!("{}0", normalised));
    }
    let value =
        BigDecimal::from_str(&normalised).map_err(|_| Error::domain("real literal", literal))?;
    Ok(intern::intern(ValueKind::Real(value)))
}

/// A real value from a machine float, rounded to the process-wide precision.
pub fn real(value: f64) -> Result<Value> {
    real_with_precision(value, real_precision())
}

/// A real value from a machine float, rounded to the given number of
/// significant digits.
pub fn real_with_precision(value: f64, precision: u32) -> Result<Value> {
    let decimal =
        BigDecimal::try_from(value).map_err(|_| Error::domain("real from float", value))?;
    let rounded = decimal.with_prec(u64::from(precision.max(1)));
    Ok(intern::intern(ValueKind::Real(rounded)))
}

/// A real value from an arbitrary-precision decimal.
#[must_use]
pub fn real_from(value: BigDecimal) -> Value {
    intern::intern(ValueKind::Real(value))
}

/// A string value.
#[must_use]
pub fn string(value: impl Into<String>) -> Value {
    intern::intern(ValueKind::String(value.into()))
}

// ============================================================================
// Datetime
// ============================================================================

/// A calendar date.
///
/// Years are restricted to `0..=9999` so the canonical form stays inside its
/// four-digit notation.
pub fn date(year: i32, month: u32, day: u32) -> Result<Value> {
    let date = make_date(year, month, day)?;
    Ok(intern::intern(ValueKind::DateTime(DateTimeValue::Date(
        date,
    ))))
}

/// A time of day with a UTC offset.
pub fn time(
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
    offset_hours: i32,
    offset_minutes: i32,
) -> Result<Value> {
    let time = make_time(hour, minute, second, millisecond)?;
    let offset = make_offset(offset_hours, offset_minutes)?;
    Ok(intern::intern(ValueKind::DateTime(DateTimeValue::Time {
        time,
        offset_minutes: offset,
    })))
}

/// A full instant: date, time of day and UTC offset.
#[allow(clippy::too_many_arguments)]
pub fn datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
    offset_hours: i32,
    offset_minutes: i32,
) -> Result<Value> {
    let date = make_date(year, month, day)?;
    let time = make_time(hour, minute, second, millisecond)?;
    let offset = make_offset(offset_hours, offset_minutes)?;
    Ok(intern::intern(ValueKind::DateTime(
        DateTimeValue::Instant {
            datetime: date.and_time(time),
            offset_minutes: offset,
        },
    )))
}

fn make_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    if !(0..=9999).contains(&year) {
        return Err(Error::domain("datetime year", year));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::domain("calendar date", format!("{}-{}-{}", year, month, day)))
}

fn make_time(hour: u32, minute: u32, second: u32, millisecond: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_milli_opt(hour, minute, second, millisecond).ok_or_else(|| {
        Error::domain(
            "time of day",
            format!("{}:{}:{}.{}", hour, minute, second, millisecond),
        )
    })
}

fn make_offset(offset_hours: i32, offset_minutes: i32) -> Result<i32> {
    let consistent = (offset_hours >= 0 && offset_minutes >= 0)
        || (offset_hours <= 0 && offset_minutes <= 0);
    if !consistent || offset_hours.abs() > 23 || offset_minutes.abs() > 59 {
        return Err(Error::domain(
            "timezone offset",
            format!("{}:{}", offset_hours, offset_minutes),
        ));
    }
    Ok(offset_hours * 60 + offset_minutes)
}

// ============================================================================
// Source locations
// ============================================================================

/// A source location naming an artifact by URI.
pub fn source_location(uri: impl Into<String>) -> Result<Value> {
    let uri = uri.into();
    check_uri(&uri)?;
    Ok(intern::intern(ValueKind::SourceLocation(SourceLocation {
        uri,
        range: None,
    })))
}

/// A source location with a character range.
pub fn source_location_with_range(
    uri: impl Into<String>,
    offset: i64,
    length: i64,
) -> Result<Value> {
    let uri = uri.into();
    check_uri(&uri)?;
    let range = make_range(offset, length, None)?;
    Ok(intern::intern(ValueKind::SourceLocation(SourceLocation {
        uri,
        range: Some(range),
    })))
}

/// A source location with a character range and line/column bounds.
#[allow(clippy::too_many_arguments)]
pub fn source_location_with_positions(
    uri: impl Into<String>,
    offset: i64,
    length: i64,
    begin_line: i64,
    begin_column: i64,
    end_line: i64,
    end_column: i64,
) -> Result<Value> {
    let uri = uri.into();
    check_uri(&uri)?;
    if begin_line < 1 || end_line < 1 {
        return Err(Error::domain(
            "source location line",
            begin_line.min(end_line),
        ));
    }
    if begin_column < 0 || end_column < 0 {
        return Err(Error::domain(
            "source location column",
            begin_column.min(end_column),
        ));
    }
    if begin_line > end_line || (begin_line == end_line && begin_column > end_column) {
        return Err(Error::domain(
            "source location bounds",
            format!(
                "<{},{}> after <{},{}>",
                begin_line, begin_column, end_line, end_column
            ),
        ));
    }
    let lines = LineColumnRange {
        begin_line: begin_line as u32,
        begin_column: begin_column as u32,
        end_line: end_line as u32,
        end_column: end_column as u32,
    };
    let range = make_range(offset, length, Some(lines))?;
    Ok(intern::intern(ValueKind::SourceLocation(SourceLocation {
        uri,
        range: Some(range),
    })))
}

fn make_range(offset: i64, length: i64, lines: Option<LineColumnRange>) -> Result<Range> {
    if offset < 0 || offset > i64::from(u32::MAX) {
        return Err(Error::domain("source location offset", offset));
    }
    if length < 0 || length > i64::from(u32::MAX) {
        return Err(Error::domain("source location length", length));
    }
    Ok(Range {
        offset: offset as u32,
        length: length as u32,
        lines,
    })
}

/// Structural URI validation: a scheme followed by an opaque body, free of
/// whitespace and the `|` delimiter.
fn check_uri(uri: &str) -> Result<()> {
    let scheme_ok = uri
        .split_once(':')
        .map(|(scheme, _)| {
            !scheme.is_empty()
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
        .unwrap_or(false);
    if !scheme_ok || uri.chars().any(|c| c.is_whitespace() || c == '|') {
        return Err(Error::domain("source location uri", uri));
    }
    Ok(())
}

// ============================================================================
// Containers
// ============================================================================

/// A list of values.
#[must_use]
pub fn list(items: Vec<Value>) -> Value {
    intern::intern(ValueKind::List(items))
}

/// A tuple of values.
#[must_use]
pub fn tuple(items: Vec<Value>) -> Value {
    intern::intern(ValueKind::Tuple(items))
}

/// A set of values; duplicates collapse.
#[must_use]
pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
    let mut transient = TransientTrieSet::new();
    for item in items {
        transient.insert(item);
    }
    set_value(transient.freeze())
}

/// A set value from an already-built [`ValueSet`].
#[must_use]
pub fn set_value(set: ValueSet) -> Value {
    intern::intern(ValueKind::Set(set))
}

/// A map of values; a key bound twice keeps the last binding.
#[must_use]
pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
    let mut transient = TransientTrieMap::new();
    for (key, value) in entries {
        transient.insert(key, value);
    }
    map_value(transient.freeze())
}

/// A map value from an already-built [`ValueMap`].
#[must_use]
pub fn map_value(map: ValueMap) -> Value {
    intern::intern(ValueKind::Map(map))
}

// ============================================================================
// Terms
// ============================================================================

/// An untyped node: any name, any children, optional keyword parameters.
#[must_use]
pub fn node(
    name: impl Into<String>,
    children: Vec<Value>,
    keywords: Vec<(String, Value)>,
) -> Value {
    intern::intern(ValueKind::Node(NodeValue::new(
        name.into(),
        children,
        KeywordParams::new(keywords),
    )))
}

/// A typed term from a declared constructor.
///
/// The arity must match the declaration and every child (and typed keyword
/// parameter) must conform to its declared type.
pub fn constructor(
    ctype: &Arc<ConstructorType>,
    children: Vec<Value>,
    keywords: Vec<(String, Value)>,
) -> Result<Value> {
    if children.len() != ctype.fields.len() {
        return Err(Error::arity(
            ctype.name.clone(),
            ctype.fields.len(),
            children.len(),
        ));
    }
    for (child, field) in children.iter().zip(&ctype.fields) {
        let actual = child.type_of();
        if !actual.is_subtype_of(field) {
            return Err(Error::type_mismatch(field, &actual));
        }
    }
    for (label, value) in &keywords {
        if let Some(declared) = ctype.keyword_parameter_type(label) {
            let actual = value.type_of();
            if !actual.is_subtype_of(declared) {
                return Err(Error::type_mismatch(declared, &actual));
            }
        }
    }
    Ok(intern::intern(ValueKind::Constructor(ConstructorValue::new(
        ctype.clone(),
        children,
        KeywordParams::new(keywords),
    ))))
}

// ============================================================================
// Writers
// ============================================================================

/// Builder for list values.
pub struct ListWriter {
    items: Option<Vec<Value>>,
}

impl ListWriter {
    #[must_use]
    pub fn new() -> Self {
        ListWriter {
            items: Some(Vec::new()),
        }
    }

    /// Appends a value at the end.
    pub fn append(&mut self, value: Value) -> Result<()> {
        match &mut self.items {
            Some(items) => {
                items.push(value);
                Ok(())
            }
            None => frozen_result(),
        }
    }

    /// Inserts a value at the front.
    pub fn insert(&mut self, value: Value) -> Result<()> {
        match &mut self.items {
            Some(items) => {
                items.insert(0, value);
                Ok(())
            }
            None => frozen_result(),
        }
    }

    /// Freezes the writer and returns the list value. Further writes fail.
    pub fn done(&mut self) -> Result<Value> {
        match self.items.take() {
            Some(items) => Ok(list(items)),
            None => frozen_result(),
        }
    }
}

impl Default for ListWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for set values.
pub struct SetWriter {
    transient: Option<TransientTrieSet<Value>>,
}

impl SetWriter {
    #[must_use]
    pub fn new() -> Self {
        SetWriter {
            transient: Some(TransientTrieSet::new()),
        }
    }

    /// Adds an element; duplicates collapse.
    pub fn insert(&mut self, value: Value) -> Result<()> {
        match &mut self.transient {
            Some(transient) => {
                transient.insert(value);
                Ok(())
            }
            None => frozen_result(),
        }
    }

    /// Freezes the writer and returns the set value. Further writes fail.
    pub fn done(&mut self) -> Result<Value> {
        match self.transient.take() {
            Some(transient) => Ok(set_value(transient.freeze())),
            None => frozen_result(),
        }
    }
}

impl Default for SetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for map values, optionally constrained by a declared map type.
pub struct MapWriter {
    transient: Option<TransientTrieMap<Value, Value>>,
    declared: Option<(Type, Type)>,
}

impl MapWriter {
    /// An unconstrained map writer.
    #[must_use]
    pub fn new() -> Self {
        MapWriter {
            transient: Some(TransientTrieMap::new()),
            declared: None,
        }
    }

    /// A writer that rejects keys and values outside the declared types.
    #[must_use]
    pub fn with_types(key: Type, value: Type) -> Self {
        MapWriter {
            transient: Some(TransientTrieMap::new()),
            declared: Some((key, value)),
        }
    }

    /// Binds `key` to `value`; a key bound twice keeps the last binding.
    pub fn put(&mut self, key: Value, value: Value) -> Result<()> {
        if let Some((key_type, value_type)) = &self.declared {
            let actual_key = key.type_of();
            if !actual_key.is_subtype_of(key_type) {
                return Err(Error::key_type(key_type, &actual_key));
            }
            let actual_value = value.type_of();
            if !actual_value.is_subtype_of(value_type) {
                return Err(Error::value_type(value_type, &actual_value));
            }
        }
        match &mut self.transient {
            Some(transient) => {
                transient.insert(key, value);
                Ok(())
            }
            None => frozen_result(),
        }
    }

    /// Freezes the writer and returns the map value. Further writes fail.
    pub fn done(&mut self) -> Result<Value> {
        match self.transient.take() {
            Some(transient) => Ok(map_value(transient.freeze())),
            None => frozen_result(),
        }
    }
}

impl Default for MapWriter {
    fn default() -> Self {
        Self::new()
    }
}
