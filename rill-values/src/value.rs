// rill-values - Core value type and canonical writer
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! First-class immutable values.
//!
//! `Value` is a cheap-to-clone handle over one interned representation.
//! Values are compared by structural equality, hash consistently with
//! equality, and print to the canonical textual form that the reader in
//! [`crate::parser`] accepts back losslessly.
//!
//! Two equality flavours exist. `==` is the strict hash-consing identity:
//! structural, *including* keyword parameters (order-insensitive).
//! [`Value::is_equal`] is the user-facing operator, which ignores keyword
//! parameter maps recursively.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::Zero;

use crate::intern::InternHandle;
use crate::map::TrieMap;
use crate::set::TrieSet;
use crate::types::{ConstructorType, Type};

/// A map from values to values.
pub type ValueMap = TrieMap<Value, Value>;

/// A set of values.
pub type ValueSet = TrieSet<Value>;

// ============================================================================
// Value
// ============================================================================

/// An immutable, hash-consed first-class value.
#[derive(Clone)]
pub struct Value {
    data: Arc<ValueData>,
}

pub(crate) struct ValueData {
    pub(crate) kind: ValueKind,
    hash: OnceLock<u64>,
    pub(crate) handle: OnceLock<InternHandle>,
}

/// The kind-specific payload of a value.
#[derive(PartialEq, Debug)]
pub enum ValueKind {
    /// `true` / `false`
    Boolean(bool),
    /// Arbitrary-precision integer
    Integer(BigInt),
    /// Normalised rational number
    Rational(BigRational),
    /// Decimal real; equality ignores trailing zeros
    Real(BigDecimal),
    /// Unicode string
    String(std::string::String),
    /// Date, time or instant
    DateTime(DateTimeValue),
    /// Position in a source artifact
    SourceLocation(SourceLocation),
    /// Ordered sequence
    List(Vec<Value>),
    /// Fixed-width tuple
    Tuple(Vec<Value>),
    /// Unordered collection of distinct values
    Set(ValueSet),
    /// Finite function from keys to values
    Map(ValueMap),
    /// Untyped term: name, positional children, keyword parameters
    Node(NodeValue),
    /// Typed term built from a declared constructor
    Constructor(ConstructorValue),
}

impl Eq for ValueKind {}

impl ValueData {
    pub(crate) fn new(kind: ValueKind) -> ValueData {
        ValueData {
            kind,
            hash: OnceLock::new(),
            handle: OnceLock::new(),
        }
    }
}

impl Drop for ValueData {
    fn drop(&mut self) {
        // An interned value notifies the cache so its dead entry can be
        // unlinked; values that never made it into the cache carry no handle.
        if let Some(handle) = self.handle.get() {
            crate::intern::enqueue_cleared(*handle);
        }
    }
}

impl Value {
    pub(crate) fn from_data(data: Arc<ValueData>) -> Value {
        Value { data }
    }

    pub(crate) fn data(&self) -> &Arc<ValueData> {
        &self.data
    }

    /// The kind-specific payload.
    #[must_use]
    pub fn kind(&self) -> &ValueKind {
        &self.data.kind
    }

    /// True when both handles share one physical representation.
    ///
    /// Hash-consing collapses structural equality to this identity for
    /// canonical instances.
    #[must_use]
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        Arc::ptr_eq(&a.data, &b.data)
    }

    /// The cached 64-bit structural hash.
    #[must_use]
    pub fn hash64(&self) -> u64 {
        *self
            .data
            .hash
            .get_or_init(|| compute_hash(&self.data.kind))
    }

    /// The dynamic type of this value.
    #[must_use]
    pub fn type_of(&self) -> Type {
        match &self.data.kind {
            ValueKind::Boolean(_) => Type::Boolean,
            ValueKind::Integer(_) => Type::Integer,
            ValueKind::Rational(_) => Type::Rational,
            ValueKind::Real(_) => Type::Real,
            ValueKind::String(_) => Type::String,
            ValueKind::DateTime(_) => Type::DateTime,
            ValueKind::SourceLocation(_) => Type::SourceLocation,
            ValueKind::List(items) => Type::list(lub_of(items.iter())),
            ValueKind::Tuple(items) => Type::tuple(items.iter().map(Value::type_of).collect()),
            ValueKind::Set(elements) => Type::set(lub_of(elements.iter())),
            ValueKind::Map(entries) => {
                let key = lub_of(entries.iter().map(|(k, _)| k));
                let value = lub_of(entries.iter().map(|(_, v)| v));
                Type::map(key, value)
            }
            ValueKind::Node(_) => Type::Node,
            ValueKind::Constructor(c) => Type::Adt(c.ctype.adt.clone()),
        }
    }

    /// The user-facing equality operator: structural, ignoring keyword
    /// parameter maps recursively.
    #[must_use]
    pub fn is_equal(&self, other: &Value) -> bool {
        if Value::ptr_eq(self, other) {
            return true;
        }
        match (&self.data.kind, &other.data.kind) {
            (ValueKind::List(a), ValueKind::List(b))
            | (ValueKind::Tuple(a), ValueKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_equal(y))
            }
            (ValueKind::Set(a), ValueKind::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.is_equal(y)))
            }
            (ValueKind::Map(a), ValueKind::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .any(|(k2, v2)| k.is_equal(k2) && v.is_equal(v2))
                    })
            }
            (ValueKind::Node(a), ValueKind::Node(b)) => {
                a.name == b.name
                    && a.children.len() == b.children.len()
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(x, y)| x.is_equal(y))
            }
            (ValueKind::Constructor(a), ValueKind::Constructor(b)) => {
                a.ctype == b.ctype
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(x, y)| x.is_equal(y))
            }
            (a, b) => a == b,
        }
    }

    /// Dispatches on the value kind through a visitor.
    pub fn accept<T: ValueVisitor>(&self, visitor: &mut T) -> T::Output {
        match &self.data.kind {
            ValueKind::Boolean(b) => visitor.visit_boolean(*b),
            ValueKind::Integer(i) => visitor.visit_integer(i),
            ValueKind::Rational(r) => visitor.visit_rational(r),
            ValueKind::Real(d) => visitor.visit_real(d),
            ValueKind::String(s) => visitor.visit_string(s),
            ValueKind::DateTime(dt) => visitor.visit_datetime(dt),
            ValueKind::SourceLocation(loc) => visitor.visit_source_location(loc),
            ValueKind::List(items) => visitor.visit_list(items),
            ValueKind::Tuple(items) => visitor.visit_tuple(items),
            ValueKind::Set(elements) => visitor.visit_set(elements),
            ValueKind::Map(entries) => visitor.visit_map(entries),
            ValueKind::Node(node) => visitor.visit_node(node),
            ValueKind::Constructor(c) => visitor.visit_constructor(c),
        }
    }

    /// The canonical textual form; `parse(print(v)) == v`.
    #[must_use]
    pub fn to_canonical_string(&self) -> std::string::String {
        self.to_string()
    }

    /// True for node-structured values (nodes and constructors).
    #[must_use]
    pub fn is_node_kind(&self) -> bool {
        matches!(
            self.data.kind,
            ValueKind::Node(_) | ValueKind::Constructor(_)
        )
    }
}

fn lub_of<'a>(values: impl Iterator<Item = &'a Value>) -> Type {
    values.fold(Type::Void, |acc, v| acc.lub(&v.type_of()))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Value::ptr_eq(self, other)
            || (self.hash64() == other.hash64() && self.data.kind == other.data.kind)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash64());
    }
}

fn compute_hash(kind: &ValueKind) -> u64 {
    let mut hasher = DefaultHasher::new();
    let state = &mut hasher;
    match kind {
        ValueKind::Boolean(b) => {
            0u8.hash(state);
            b.hash(state);
        }
        ValueKind::Integer(i) => {
            1u8.hash(state);
            i.hash(state);
        }
        ValueKind::Rational(r) => {
            2u8.hash(state);
            r.numer().hash(state);
            r.denom().hash(state);
        }
        ValueKind::Real(d) => {
            3u8.hash(state);
            if !d.is_zero() {
                // Equal reals with different scales must hash identically.
                let (mantissa, scale) = d.normalized().as_bigint_and_exponent();
                mantissa.hash(state);
                scale.hash(state);
            }
        }
        ValueKind::String(s) => {
            4u8.hash(state);
            s.hash(state);
        }
        ValueKind::DateTime(dt) => {
            5u8.hash(state);
            dt.hash(state);
        }
        ValueKind::SourceLocation(loc) => {
            6u8.hash(state);
            loc.hash(state);
        }
        ValueKind::List(items) => {
            7u8.hash(state);
            items.hash(state);
        }
        ValueKind::Tuple(items) => {
            8u8.hash(state);
            items.hash(state);
        }
        ValueKind::Set(elements) => {
            9u8.hash(state);
            elements.hash(state);
        }
        ValueKind::Map(entries) => {
            10u8.hash(state);
            entries.hash(state);
        }
        ValueKind::Node(node) => {
            11u8.hash(state);
            node.name.hash(state);
            node.children.hash(state);
            node.keywords.hash(state);
        }
        ValueKind::Constructor(c) => {
            12u8.hash(state);
            c.ctype.adt.name.hash(state);
            c.ctype.name.hash(state);
            c.children.hash(state);
            c.keywords.hash(state);
        }
    }
    hasher.finish()
}

// ============================================================================
// Terms: nodes, constructors, keyword parameters
// ============================================================================

/// Keyword parameters of a node or constructor, kept sorted by name.
///
/// The stored (and printed) order is the name order, so printing is stable
/// per value and independent of how the parameters were supplied. A label
/// supplied twice keeps the last binding.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct KeywordParams {
    entries: Vec<(std::string::String, Value)>,
}

impl KeywordParams {
    /// Builds the parameter map, sorting by name; later duplicates win.
    #[must_use]
    pub fn new(entries: Vec<(std::string::String, Value)>) -> Self {
        let mut out: Vec<(std::string::String, Value)> = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            match out.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => out.push((name, value)),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        KeywordParams { entries: out }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterator over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// An untyped term: a name applied to positional children, with optional
/// keyword parameters.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NodeValue {
    name: std::string::String,
    children: Vec<Value>,
    keywords: KeywordParams,
}

impl NodeValue {
    pub(crate) fn new(
        name: std::string::String,
        children: Vec<Value>,
        keywords: KeywordParams,
    ) -> Self {
        NodeValue {
            name,
            children,
            keywords,
        }
    }

    /// The node name. Any string is admissible; names that are not plain
    /// identifiers print quoted.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The positional children.
    #[must_use]
    pub fn children(&self) -> &[Value] {
        &self.children
    }

    /// The keyword parameters.
    #[must_use]
    pub fn keyword_parameters(&self) -> &KeywordParams {
        &self.keywords
    }
}

/// A typed term built from a declared constructor.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConstructorValue {
    ctype: Arc<ConstructorType>,
    children: Vec<Value>,
    keywords: KeywordParams,
}

impl ConstructorValue {
    pub(crate) fn new(
        ctype: Arc<ConstructorType>,
        children: Vec<Value>,
        keywords: KeywordParams,
    ) -> Self {
        ConstructorValue {
            ctype,
            children,
            keywords,
        }
    }

    /// The declared constructor type.
    #[must_use]
    pub fn constructor_type(&self) -> &Arc<ConstructorType> {
        &self.ctype
    }

    /// The constructor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.ctype.name
    }

    /// The positional children.
    #[must_use]
    pub fn children(&self) -> &[Value] {
        &self.children
    }

    /// The keyword parameters.
    #[must_use]
    pub fn keyword_parameters(&self) -> &KeywordParams {
        &self.keywords
    }
}

// ============================================================================
// Datetime
// ============================================================================

/// A date, a time of day, or a full instant; millisecond precision, with an
/// explicit UTC offset on the time-bearing forms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DateTimeValue {
    /// A calendar date: `$2020-10-26$`
    Date(NaiveDate),
    /// A time of day: `$T18:36:56.342+00:00$`
    Time {
        time: NaiveTime,
        offset_minutes: i32,
    },
    /// A full instant: `$2020-10-26T18:36:56.342+00:00$`
    Instant {
        datetime: NaiveDateTime,
        offset_minutes: i32,
    },
}

// ============================================================================
// Source locations
// ============================================================================

/// A position in a source artifact: a URI, optionally refined by a character
/// range and line/column bounds.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceLocation {
    pub(crate) uri: std::string::String,
    pub(crate) range: Option<Range>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Range {
    pub(crate) offset: u32,
    pub(crate) length: u32,
    pub(crate) lines: Option<LineColumnRange>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct LineColumnRange {
    pub(crate) begin_line: u32,
    pub(crate) begin_column: u32,
    pub(crate) end_line: u32,
    pub(crate) end_column: u32,
}

impl SourceLocation {
    /// The location's URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Character offset of the range, when present.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.range.map(|r| r.offset)
    }

    /// Character length of the range, when present.
    #[must_use]
    pub fn length(&self) -> Option<u32> {
        self.range.map(|r| r.length)
    }

    /// Line of the range start, when line/column bounds are present.
    #[must_use]
    pub fn begin_line(&self) -> Option<u32> {
        self.range.and_then(|r| r.lines).map(|l| l.begin_line)
    }

    /// Column of the range start, when line/column bounds are present.
    #[must_use]
    pub fn begin_column(&self) -> Option<u32> {
        self.range.and_then(|r| r.lines).map(|l| l.begin_column)
    }

    /// Line of the range end, when line/column bounds are present.
    #[must_use]
    pub fn end_line(&self) -> Option<u32> {
        self.range.and_then(|r| r.lines).map(|l| l.end_line)
    }

    /// Column of the range end, when line/column bounds are present.
    #[must_use]
    pub fn end_column(&self) -> Option<u32> {
        self.range.and_then(|r| r.lines).map(|l| l.end_column)
    }
}

// ============================================================================
// Visitor
// ============================================================================

/// Dispatch over the value kinds.
///
/// Traversals use this capability instead of matching on [`ValueKind`]
/// directly, so consumers stay insulated from the payload representation.
/// The canonical writer below is the resident example.
pub trait ValueVisitor {
    type Output;

    fn visit_boolean(&mut self, value: bool) -> Self::Output;
    fn visit_integer(&mut self, value: &BigInt) -> Self::Output;
    fn visit_rational(&mut self, value: &BigRational) -> Self::Output;
    fn visit_real(&mut self, value: &BigDecimal) -> Self::Output;
    fn visit_string(&mut self, value: &str) -> Self::Output;
    fn visit_datetime(&mut self, value: &DateTimeValue) -> Self::Output;
    fn visit_source_location(&mut self, value: &SourceLocation) -> Self::Output;
    fn visit_list(&mut self, items: &[Value]) -> Self::Output;
    fn visit_tuple(&mut self, items: &[Value]) -> Self::Output;
    fn visit_set(&mut self, elements: &ValueSet) -> Self::Output;
    fn visit_map(&mut self, entries: &ValueMap) -> Self::Output;
    fn visit_node(&mut self, node: &NodeValue) -> Self::Output;
    fn visit_constructor(&mut self, value: &ConstructorValue) -> Self::Output;
}

// ============================================================================
// Canonical writer
// ============================================================================

/// The standard textual writer, as a visitor over the value kinds.
///
/// Deterministic: `==`-equal values print byte-for-byte identically.
struct CanonicalWriter<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
}

impl CanonicalWriter<'_, '_> {
    fn write_joined(&mut self, items: &[Value]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(self.out, ",")?;
            }
            item.accept(self)?;
        }
        Ok(())
    }

    fn write_keywords(&mut self, keywords: &KeywordParams, first_in_list: bool) -> fmt::Result {
        let mut first = first_in_list;
        for (name, value) in keywords.iter() {
            if !first {
                write!(self.out, ",")?;
            }
            first = false;
            write!(self.out, "{}=", name)?;
            value.accept(self)?;
        }
        Ok(())
    }

    fn write_term(
        &mut self,
        name: &str,
        children: &[Value],
        keywords: &KeywordParams,
    ) -> fmt::Result {
        if is_plain_identifier(name) {
            write!(self.out, "{}", name)?;
        } else {
            write!(self.out, "\"")?;
            write_escaped(self.out, name)?;
            write!(self.out, "\"")?;
        }
        write!(self.out, "(")?;
        self.write_joined(children)?;
        self.write_keywords(keywords, children.is_empty())?;
        write!(self.out, ")")
    }
}

impl ValueVisitor for CanonicalWriter<'_, '_> {
    type Output = fmt::Result;

    fn visit_boolean(&mut self, value: bool) -> fmt::Result {
        write!(self.out, "{}", value)
    }

    fn visit_integer(&mut self, value: &BigInt) -> fmt::Result {
        write!(self.out, "{}", value)
    }

    fn visit_rational(&mut self, value: &BigRational) -> fmt::Result {
        write!(self.out, "{}r{}", value.numer(), value.denom())
    }

    fn visit_real(&mut self, value: &BigDecimal) -> fmt::Result {
        write!(self.out, "{}", format_real(value))
    }

    fn visit_string(&mut self, value: &str) -> fmt::Result {
        write!(self.out, "\"")?;
        write_escaped(self.out, value)?;
        write!(self.out, "\"")
    }

    fn visit_datetime(&mut self, value: &DateTimeValue) -> fmt::Result {
        match value {
            DateTimeValue::Date(date) => {
                write!(self.out, "$")?;
                write_date(self.out, date)?;
                write!(self.out, "$")
            }
            DateTimeValue::Time {
                time,
                offset_minutes,
            } => {
                write!(self.out, "$T")?;
                write_time(self.out, time, *offset_minutes)?;
                write!(self.out, "$")
            }
            DateTimeValue::Instant {
                datetime,
                offset_minutes,
            } => {
                write!(self.out, "$")?;
                write_date(self.out, &datetime.date())?;
                write!(self.out, "T")?;
                write_time(self.out, &datetime.time(), *offset_minutes)?;
                write!(self.out, "$")
            }
        }
    }

    fn visit_source_location(&mut self, value: &SourceLocation) -> fmt::Result {
        write!(self.out, "|{}|", value.uri)?;
        if let Some(range) = &value.range {
            write!(self.out, "({},{}", range.offset, range.length)?;
            if let Some(lines) = &range.lines {
                write!(
                    self.out,
                    ",<{},{}>,<{},{}>",
                    lines.begin_line, lines.begin_column, lines.end_line, lines.end_column
                )?;
            }
            write!(self.out, ")")?;
        }
        Ok(())
    }

    fn visit_list(&mut self, items: &[Value]) -> fmt::Result {
        write!(self.out, "[")?;
        self.write_joined(items)?;
        write!(self.out, "]")
    }

    fn visit_tuple(&mut self, items: &[Value]) -> fmt::Result {
        write!(self.out, "<")?;
        self.write_joined(items)?;
        write!(self.out, ">")
    }

    fn visit_set(&mut self, elements: &ValueSet) -> fmt::Result {
        write!(self.out, "{{")?;
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                write!(self.out, ",")?;
            }
            element.accept(self)?;
        }
        write!(self.out, "}}")
    }

    fn visit_map(&mut self, entries: &ValueMap) -> fmt::Result {
        write!(self.out, "(")?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                write!(self.out, ",")?;
            }
            key.accept(self)?;
            write!(self.out, ":")?;
            value.accept(self)?;
        }
        write!(self.out, ")")
    }

    fn visit_node(&mut self, node: &NodeValue) -> fmt::Result {
        self.write_term(&node.name, &node.children, &node.keywords)
    }

    fn visit_constructor(&mut self, value: &ConstructorValue) -> fmt::Result {
        self.write_term(&value.ctype.name, &value.children, &value.keywords)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = CanonicalWriter { out: f };
        self.accept(&mut writer)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// True when `name` prints bare as a node name.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }
    name != "true" && name != "false"
}

fn write_escaped(out: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    for c in s.chars() {
        match c {
            '\n' => write!(out, "\\n")?,
            '\t' => write!(out, "\\t")?,
            '\r' => write!(out, "\\r")?,
            '\x0C' => write!(out, "\\f")?,
            '\x08' => write!(out, "\\b")?,
            '"' => write!(out, "\\\"")?,
            '\\' => write!(out, "\\\\")?,
            '\'' => write!(out, "\\'")?,
            '<' => write!(out, "\\<")?,
            '>' => write!(out, "\\>")?,
            c if (c as u32) < 0x20 => write!(out, "\\a{:02X}", c as u32)?,
            c => write!(out, "{}", c)?,
        }
    }
    Ok(())
}

fn write_date(out: &mut fmt::Formatter<'_>, date: &NaiveDate) -> fmt::Result {
    write!(
        out,
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

fn write_time(out: &mut fmt::Formatter<'_>, time: &NaiveTime, offset_minutes: i32) -> fmt::Result {
    write!(
        out,
        "{:02}:{:02}:{:02}.{:03}",
        time.hour(),
        time.minute(),
        time.second(),
        time.nanosecond() / 1_000_000
    )?;
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let magnitude = offset_minutes.unsigned_abs();
    write!(out, "{}{:02}:{:02}", sign, magnitude / 60, magnitude % 60)
}

/// Renders a real in canonical form: normalised, and always carrying a `.`
/// or an exponent so it reads back as a real.
fn format_real(value: &BigDecimal) -> std::string::String {
    if value.is_zero() {
        return "0.0".into();
    }
    let (mantissa, scale) = value.normalized().as_bigint_and_exponent();
    let negative = mantissa.sign() == Sign::Minus;
    let digits = mantissa.magnitude().to_string();
    let adjusted = digits.len() as i64 - 1 - scale;

    let mut out = std::string::String::new();
    if negative {
        out.push('-');
    }
    if (-5..=20).contains(&adjusted) {
        if scale <= 0 {
            out.push_str(&digits);
            for _ in 0..(-scale) {
                out.push('0');
            }
            out.push_str(".0");
        } else if (digits.len() as i64) > scale {
            let point = digits.len() - scale as usize;
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        } else {
            out.push_str("0.");
            for _ in 0..(scale as usize - digits.len()) {
                out.push('0');
            }
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push_str(&adjusted.to_string());
    }
    out
}
