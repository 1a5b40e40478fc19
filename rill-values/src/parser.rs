// rill-values - Reader for the canonical text form
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! Single-pass reader for the canonical textual form.
//!
//! The reader is a recursive-descent parser over the scanner in
//! [`crate::lexer`]. It threads an expected type through every production,
//! validates each produced value against it, and resolves constructor names
//! through a [`TypeStore`]; names that resolve to nothing fall back to
//! untyped nodes. The legacy trailing annotation block `[@k=v, ...]` is
//! accepted after any node-structured value and folded into keyword
//! parameters.
//!
//! Every value comes out of the factory, so reading a literal yields the
//! canonical interned instance.

use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::factory::{self, ListWriter, MapWriter, SetWriter};
use crate::lexer::{is_identifier_part, is_identifier_start, Scanner};
use crate::types::{ConstructorType, Type, TypeStore};
use crate::value::{Value, ValueKind};

/// Reads one value from `source`, validating it against `expected`.
///
/// The whole input must be consumed; trailing characters are a parse error.
pub fn read(source: &str, expected: &Type, store: &TypeStore) -> Result<Value> {
    Reader::new(source, store).read(expected)
}

/// Reads one untyped value from `source`.
pub fn read_value(source: &str) -> Result<Value> {
    let store = TypeStore::new();
    read(source, &Type::Value, &store)
}

/// Reader state for a single input.
pub struct Reader<'a> {
    scanner: Scanner<'a>,
    store: &'a TypeStore,
    current: Option<char>,
}

impl<'a> Reader<'a> {
    /// Creates a reader over `source` resolving constructors in `store`.
    #[must_use]
    pub fn new(source: &'a str, store: &'a TypeStore) -> Self {
        Reader {
            scanner: Scanner::new(source),
            store,
            current: None,
        }
    }

    /// Reads the single value the input holds.
    pub fn read(&mut self, expected: &Type) -> Result<Value> {
        self.advance();
        let result = self.read_value(expected)?;
        if self.current.is_some() {
            return Err(self.unexpected());
        }
        Ok(result)
    }

    // ========================================================================
    // Cursor plumbing
    // ========================================================================

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn advance_raw(&mut self) {
        self.current = self.scanner.next_raw();
    }

    fn offset(&self) -> usize {
        self.scanner.offset()
    }

    fn unexpected(&self) -> Error {
        match self.current {
            Some(c) => Error::parse(self.offset(), format!("unexpected '{}'", c)),
            None => Error::parse(self.offset(), "unexpected end of input"),
        }
    }

    fn check_and_advance(&mut self, expected: char) -> Result<()> {
        if self.current == Some(expected) {
            self.advance();
            Ok(())
        } else {
            let found = match self.current {
                Some(c) => format!("'{}'", c),
                None => "end of input".to_string(),
            };
            Err(Error::parse(
                self.offset(),
                format!("expected '{}' but got {}", expected, found),
            ))
        }
    }

    // ========================================================================
    // Value dispatch
    // ========================================================================

    fn read_value(&mut self, expected: &Type) -> Result<Value> {
        let Some(c) = self.current else {
            return Err(self.unexpected());
        };

        let mut result = if c.is_ascii_digit() || c == '.' || c == '-' {
            self.read_number()?
        } else if is_identifier_start(c) || c == '\\' {
            let escaped = c == '\\';
            let id = self.read_identifier();
            if !escaped && id == "true" && !expected.is_abstract_data() {
                factory::boolean(true)
            } else if !escaped && id == "false" && !expected.is_abstract_data() {
                factory::boolean(false)
            } else if self.current == Some('=') {
                // A keyword label; the enclosing argument list handles the
                // '=' and the type check does not apply.
                return Ok(factory::string(id));
            } else if self.current == Some('(') {
                self.read_term(id, expected)?
            } else {
                return Err(Error::parse(
                    self.offset(),
                    format!("expected '=' or '(' after identifier '{}'", id),
                ));
            }
        } else {
            match c {
                '"' => self.read_string(expected)?,
                '[' => self.read_list(expected)?,
                '{' => self.read_set(expected)?,
                '<' => self.read_tuple(expected)?,
                '(' => self.read_map(expected)?,
                '|' => self.read_location()?,
                '$' => self.read_datetime()?,
                _ => return Err(self.unexpected()),
            }
        };

        let actual = result.type_of();
        if !actual.is_subtype_of(expected) {
            return Err(Error::type_mismatch(expected, &actual));
        }

        if self.current == Some('[') {
            if result.is_node_kind() {
                result = self.read_annotations(result)?;
            } else {
                return Err(self.unexpected());
            }
        }

        Ok(result)
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    fn read_number(&mut self) -> Result<Value> {
        let start = self.offset();
        let mut literal = String::new();
        while let Some(c) = self.current {
            if c.is_ascii_digit() || matches!(c, 'r' | '.' | 'e' | 'E' | '+' | '-') {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }

        for needle in ['r', '.', 'e', 'E'] {
            if literal.matches(needle).count() > 1 {
                return Err(Error::parse(
                    start,
                    format!("'{}' occurred twice in number '{}'", needle, literal),
                ));
            }
        }

        // Reals are recognised by '.' or an exponent; everything else is an
        // integer first, with real-then-rational fallback.
        if literal.contains('.') || literal.contains('e') || literal.contains('E') {
            if let Ok(value) = factory::real_from_str(&literal) {
                return Ok(value);
            }
        } else if let Ok(value) = factory::integer_from_str(&literal) {
            return Ok(value);
        }
        if let Ok(value) = factory::real_from_str(&literal) {
            return Ok(value);
        }
        if let Ok(value) = factory::rational_from_str(&literal) {
            return Ok(value);
        }
        Err(Error::parse(
            start,
            format!("malformed number '{}'", literal),
        ))
    }

    // ========================================================================
    // Identifiers, terms, annotations
    // ========================================================================

    fn read_identifier(&mut self) -> String {
        let escaped = self.current == Some('\\');
        if escaped {
            self.advance();
        }
        let mut id = String::new();
        while let Some(c) = self.current {
            if is_identifier_part(c) || (escaped && c == '-') {
                id.push(c);
                self.advance();
            } else {
                break;
            }
        }
        id
    }

    fn read_term(&mut self, id: String, expected: &Type) -> Result<Value> {
        let mut constructor: Option<Arc<ConstructorType>> = None;
        let mut field_types: Option<Vec<Type>> = None;

        if let Type::Adt(adt) = expected {
            let alternatives = self.store.lookup_constructor(adt, &id);
            if alternatives.len() > 1 {
                return Err(Error::overload(id, alternatives.len()));
            }
            if let Some(c) = alternatives.into_iter().next() {
                field_types = Some(c.fields.clone());
                constructor = Some(c);
            }
            // Unresolved names read their children untyped and fall back to
            // an untyped node below.
        }

        let mut children = Vec::new();
        let mut keywords = Vec::new();
        self.read_fixed(
            field_types.as_deref(),
            constructor.as_ref(),
            ')',
            &mut children,
            &mut keywords,
        )?;

        if expected.is_top() {
            let arg_types: Vec<Type> = children.iter().map(Value::type_of).collect();
            constructor = self.store.lookup_first_constructor(&id, &arg_types);
        }

        match constructor {
            Some(c) => factory::constructor(&c, children, keywords),
            None => Ok(factory::node(id, children, keywords)),
        }
    }

    /// Reads a `(`/`<` argument list up to `end`: positional values plus
    /// inline `label=value` keyword parameters.
    fn read_fixed(
        &mut self,
        field_types: Option<&[Type]>,
        constructor: Option<&Arc<ConstructorType>>,
        end: char,
        children: &mut Vec<Value>,
        keywords: &mut Vec<(String, Value)>,
    ) -> Result<()> {
        self.advance();
        let mut position = 0usize;
        while self.current != Some(end) {
            let expected = field_types
                .and_then(|fields| fields.get(position))
                .cloned()
                .unwrap_or(Type::Value);
            let element = self.read_value(&expected)?;

            if self.current == Some('=') {
                let ValueKind::String(label) = element.kind() else {
                    return Err(Error::parse(
                        self.offset(),
                        "keyword label must be an identifier",
                    ));
                };
                let label = label.clone();
                self.advance();
                let keyword_type = constructor
                    .and_then(|c| c.keyword_parameter_type(&label))
                    .cloned()
                    .unwrap_or(Type::Value);
                let value = self.read_value(&keyword_type)?;
                keywords.push((label, value));
            } else {
                children.push(element);
            }

            position += 1;
            if self.current != Some(',') {
                break;
            }
            self.advance();
        }
        self.check_and_advance(end)
    }

    fn read_annotations(&mut self, result: Value) -> Result<Value> {
        // Legacy form: value[@k=v, ...]. Read as annotations, stored as
        // keyword parameters.
        self.advance();
        let mut added = Vec::new();
        loop {
            if self.current == Some(']') {
                break;
            }
            self.check_and_advance('@')?;
            let label = self.read_identifier();
            if label.is_empty() {
                return Err(Error::parse(self.offset(), "empty annotation label"));
            }
            self.check_and_advance('=')?;
            let value = self.read_value(&Type::Value)?;
            added.push((label, value));
            if self.current != Some(',') {
                break;
            }
            self.advance();
        }
        self.check_and_advance(']')?;

        match result.kind() {
            ValueKind::Node(node) => {
                let mut merged: Vec<(String, Value)> = node
                    .keyword_parameters()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                merged.extend(added);
                Ok(factory::node(
                    node.name(),
                    node.children().to_vec(),
                    merged,
                ))
            }
            ValueKind::Constructor(c) => {
                let mut merged: Vec<(String, Value)> = c
                    .keyword_parameters()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                merged.extend(added);
                let ctype = c.constructor_type().clone();
                factory::constructor(&ctype, c.children().to_vec(), merged)
            }
            _ => Err(self.unexpected()),
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    fn read_string(&mut self, _expected: &Type) -> Result<Value> {
        let body = self.read_string_literal()?;
        if self.current == Some('(') {
            // A quoted node name.
            let mut children = Vec::new();
            let mut keywords = Vec::new();
            self.read_fixed(None, None, ')', &mut children, &mut keywords)?;
            return Ok(factory::node(body, children, keywords));
        }
        Ok(factory::string(body))
    }

    fn read_string_literal(&mut self) -> Result<String> {
        let mut body = String::new();
        self.advance_raw();
        loop {
            match self.current {
                None => {
                    return Err(Error::parse(
                        self.offset(),
                        "end of input before end of string",
                    ))
                }
                Some('"') => break,
                Some('\\') => {
                    self.advance_raw();
                    let Some(escape) = self.current else {
                        return Err(Error::parse(
                            self.offset(),
                            "end of input before end of string",
                        ));
                    };
                    match escape {
                        'n' => body.push('\n'),
                        't' => body.push('\t'),
                        'r' => body.push('\r'),
                        'f' => body.push('\x0C'),
                        'b' => body.push('\x08'),
                        'a' => body.push(self.read_escaped_code_point(2)?),
                        'u' => body.push(self.read_escaped_code_point(4)?),
                        'U' => body.push(self.read_escaped_code_point(6)?),
                        other => body.push(other),
                    }
                    self.advance_raw();
                }
                Some(c) => {
                    body.push(c);
                    self.advance_raw();
                }
            }
        }
        // Past the closing quote, back to token mode.
        self.advance();
        Ok(body)
    }

    /// Decodes `digits` hex characters into a code point; the cursor is left
    /// on the last digit.
    fn read_escaped_code_point(&mut self, digits: usize) -> Result<char> {
        let mut code_point = 0u32;
        for _ in 0..digits {
            self.advance_raw();
            let digit = self
                .current
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| Error::parse(self.offset(), "expected hex digit in escape"))?;
            code_point = code_point * 16 + digit;
        }
        char::from_u32(code_point).ok_or_else(|| {
            Error::parse(
                self.offset(),
                format!("{:X} is not a valid code point", code_point),
            )
        })
    }

    // ========================================================================
    // Containers
    // ========================================================================

    fn read_list(&mut self, expected: &Type) -> Result<Value> {
        let element_type = match expected {
            Type::List(element) => (**element).clone(),
            _ => Type::Value,
        };
        let mut writer = ListWriter::new();
        self.advance();
        while self.current != Some(']') {
            writer.append(self.read_value(&element_type)?)?;
            if self.current != Some(',') {
                break;
            }
            self.advance();
        }
        self.check_and_advance(']')?;
        writer.done()
    }

    fn read_set(&mut self, expected: &Type) -> Result<Value> {
        let element_type = match expected {
            Type::Set(element) => (**element).clone(),
            _ => Type::Value,
        };
        let mut writer = SetWriter::new();
        self.advance();
        while self.current != Some('}') {
            writer.insert(self.read_value(&element_type)?)?;
            if self.current != Some(',') {
                break;
            }
            self.advance();
        }
        self.check_and_advance('}')?;
        writer.done()
    }

    fn read_tuple(&mut self, expected: &Type) -> Result<Value> {
        let mut items = Vec::new();
        let mut keywords = Vec::new();
        self.read_fixed(expected.tuple_fields(), None, '>', &mut items, &mut keywords)?;
        if !keywords.is_empty() {
            return Err(Error::parse(
                self.offset(),
                "keyword parameter outside a node",
            ));
        }
        Ok(factory::tuple(items))
    }

    fn read_map(&mut self, expected: &Type) -> Result<Value> {
        let (key_type, value_type) = match expected.map_types() {
            Some((k, v)) => (k.clone(), v.clone()),
            None => (Type::Value, Type::Value),
        };
        let mut writer = MapWriter::new();
        self.advance();
        while self.current != Some(')') {
            let key = self.read_value(&key_type)?;
            self.check_and_advance(':')?;
            let value = self.read_value(&value_type)?;
            writer.put(key, value)?;
            if self.current != Some(',') {
                break;
            }
            self.advance();
        }
        self.check_and_advance(')')?;
        writer.done()
    }

    // ========================================================================
    // Source locations
    // ========================================================================

    fn read_location(&mut self) -> Result<Value> {
        let mut uri = String::new();
        self.advance();
        loop {
            match self.current {
                Some('|') => break,
                Some(c) => {
                    uri.push(c);
                    self.advance();
                }
                None => return Err(self.unexpected()),
            }
        }
        self.advance();

        if self.current != Some('(') {
            return factory::source_location(uri);
        }

        let mut args = Vec::new();
        let mut keywords = Vec::new();
        self.read_fixed(None, None, ')', &mut args, &mut keywords)?;
        if !keywords.is_empty() {
            return Err(Error::parse(
                self.offset(),
                "keyword parameter outside a node",
            ));
        }
        match args.len() {
            2 => {
                let offset = self.integer_argument(&args[0])?;
                let length = self.integer_argument(&args[1])?;
                factory::source_location_with_range(uri, offset, length)
            }
            4 => {
                let offset = self.integer_argument(&args[0])?;
                let length = self.integer_argument(&args[1])?;
                let (begin_line, begin_column) = self.position_argument(&args[2])?;
                let (end_line, end_column) = self.position_argument(&args[3])?;
                factory::source_location_with_positions(
                    uri,
                    offset,
                    length,
                    begin_line,
                    begin_column,
                    end_line,
                    end_column,
                )
            }
            _ => Err(Error::parse(
                self.offset(),
                "source locations have either 2 or 4 arguments",
            )),
        }
    }

    fn integer_argument(&self, value: &Value) -> Result<i64> {
        match value.kind() {
            ValueKind::Integer(i) => i
                .to_i64()
                .ok_or_else(|| Error::domain("source location argument", i)),
            _ => Err(Error::type_mismatch(&Type::Integer, &value.type_of())),
        }
    }

    fn position_argument(&self, value: &Value) -> Result<(i64, i64)> {
        let expected = Type::tuple(vec![Type::Integer, Type::Integer]);
        match value.kind() {
            ValueKind::Tuple(items) if items.len() == 2 => {
                let line = self.integer_argument(&items[0])?;
                let column = self.integer_argument(&items[1])?;
                Ok((line, column))
            }
            _ => Err(Error::type_mismatch(&expected, &value.type_of())),
        }
    }

    // ========================================================================
    // Datetimes
    // ========================================================================

    fn read_datetime(&mut self) -> Result<Value> {
        self.advance();
        if matches!(self.current, Some('T' | 't')) {
            self.advance();
            let (hour, minute, second, milli, tz_hours, tz_minutes) = self.read_time_parts()?;
            self.consume_datetime_end();
            return factory::time(hour, minute, second, milli, tz_hours, tz_minutes);
        }

        let year = self.read_fixed_digits(4, "date")? as i32;
        self.check_and_advance('-')?;
        let month = self.read_fixed_digits(2, "date")?;
        self.check_and_advance('-')?;
        let day = self.read_fixed_digits(2, "date")?;

        if matches!(self.current, Some('T' | 't')) {
            self.advance();
            let (hour, minute, second, milli, tz_hours, tz_minutes) = self.read_time_parts()?;
            self.consume_datetime_end();
            factory::datetime(
                year, month, day, hour, minute, second, milli, tz_hours, tz_minutes,
            )
        } else {
            self.consume_datetime_end();
            factory::date(year, month, day)
        }
    }

    fn consume_datetime_end(&mut self) {
        // The closing '$' is consumed when present; the bare legacy form is
        // accepted as well.
        if self.current == Some('$') {
            self.advance();
        }
    }

    fn read_time_parts(&mut self) -> Result<(u32, u32, u32, u32, i32, i32)> {
        let hour = self.read_fixed_digits(2, "time")?;
        self.check_and_advance(':')?;
        let minute = self.read_fixed_digits(2, "time")?;
        self.check_and_advance(':')?;
        let second = self.read_fixed_digits(2, "time")?;
        self.check_and_advance('.')?;
        let milli = self.read_fixed_digits(3, "time")?;

        let negative = match self.current {
            Some('+') => false,
            Some('-') => true,
            _ => {
                return Err(Error::parse(
                    self.offset(),
                    "expected '+' or '-' in timezone offset",
                ))
            }
        };
        self.advance();
        let tz_hours = self.read_fixed_digits(2, "timezone")? as i32;
        if self.current == Some(':') {
            self.advance();
        }
        let tz_minutes = self.read_fixed_digits(2, "timezone")? as i32;
        let sign = if negative { -1 } else { 1 };
        Ok((hour, minute, second, milli, sign * tz_hours, sign * tz_minutes))
    }

    fn read_fixed_digits(&mut self, count: usize, what: &str) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self
                .current
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| {
                    Error::parse(self.offset(), format!("expected digit in {}", what))
                })?;
            value = value * 10 + digit;
            self.advance();
        }
        Ok(value)
    }
}
