// rill-values - Type lattice and constructor store
// Copyright (c) 2025 The Rill Project. MIT licensed.

//! The slice of the Rill type system the value core needs: a lattice of
//! value types with subtyping and least upper bounds, and a store of
//! declared abstract data types and their constructors.
//!
//! The full type algebra (parameter types, aliases, instantiation) lives
//! outside this crate; the reader and the factory only consume the subtype
//! predicate and constructor resolution defined here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A value type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    /// Top: every value has this type.
    Value,
    /// Bottom: the type of no value, element type of empty containers.
    Void,
    /// Supertype of `Integer`, `Rational` and `Real`.
    Number,
    /// Arbitrary-precision integers.
    Integer,
    /// Rational numbers.
    Rational,
    /// Decimal reals.
    Real,
    /// Booleans.
    Boolean,
    /// Unicode strings.
    String,
    /// Dates, times and instants.
    DateTime,
    /// Source locations.
    SourceLocation,
    /// Homogeneous lists, covariant in the element type.
    List(Box<Type>),
    /// Sets, covariant in the element type.
    Set(Box<Type>),
    /// Maps, covariant in key and value types.
    Map(Box<Type>, Box<Type>),
    /// Fixed-width tuples, with optional field labels.
    Tuple(Arc<TupleType>),
    /// Supertype of all term-structured values.
    Node,
    /// A declared abstract data type.
    Adt(Arc<AdtType>),
    /// A declared constructor of an abstract data type.
    Constructor(Arc<ConstructorType>),
}

/// Field types of a tuple, with optional labels.
///
/// Labels never influence subtyping or equality of the carried values; they
/// exist so declared signatures can be reflected. Values built from plain
/// literals carry label-free tuple types.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct TupleType {
    pub fields: Vec<Type>,
    pub labels: Option<Vec<std::string::String>>,
}

/// A declared abstract data type, identified by name.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct AdtType {
    pub name: std::string::String,
}

/// A declared constructor: its ADT, name, positional field types and
/// keyword parameter types.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct ConstructorType {
    pub adt: Arc<AdtType>,
    pub name: std::string::String,
    pub fields: Vec<Type>,
    pub field_labels: Option<Vec<std::string::String>>,
    pub keyword_parameters: Vec<(std::string::String, Type)>,
}

impl ConstructorType {
    /// The declared type of the keyword parameter `label`, if any.
    pub fn keyword_parameter_type(&self, label: &str) -> Option<&Type> {
        self.keyword_parameters
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, ty)| ty)
    }
}

impl Type {
    /// A label-free tuple type.
    pub fn tuple(fields: Vec<Type>) -> Type {
        Type::Tuple(Arc::new(TupleType {
            fields,
            labels: None,
        }))
    }

    /// A list type.
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    /// A set type.
    pub fn set(element: Type) -> Type {
        Type::Set(Box::new(element))
    }

    /// A map type.
    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// True for the top type.
    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Type::Value)
    }

    /// True for declared abstract data types.
    #[must_use]
    pub fn is_abstract_data(&self) -> bool {
        matches!(self, Type::Adt(_))
    }

    /// True when values of this type carry named fields.
    ///
    /// Literal tuples always produce label-free types.
    #[must_use]
    pub fn has_field_names(&self) -> bool {
        match self {
            Type::Tuple(t) => t.labels.is_some(),
            Type::Constructor(c) => c.field_labels.is_some(),
            _ => false,
        }
    }

    /// The subtype relation of the lattice.
    #[must_use]
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self == other || matches!(other, Type::Value) || matches!(self, Type::Void) {
            return true;
        }
        match (self, other) {
            (Type::Integer | Type::Rational | Type::Real, Type::Number) => true,
            (Type::List(a), Type::List(b)) | (Type::Set(a), Type::Set(b)) => a.is_subtype_of(b),
            (Type::Map(ka, va), Type::Map(kb, vb)) => {
                ka.is_subtype_of(kb) && va.is_subtype_of(vb)
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(x, y)| x.is_subtype_of(y))
            }
            (Type::Adt(_) | Type::Constructor(_), Type::Node) => true,
            (Type::Constructor(c), Type::Adt(a)) => c.adt == *a,
            _ => false,
        }
    }

    /// Least upper bound of two types.
    #[must_use]
    pub fn lub(&self, other: &Type) -> Type {
        if self == other {
            return self.clone();
        }
        if matches!(self, Type::Void) {
            return other.clone();
        }
        if matches!(other, Type::Void) {
            return self.clone();
        }
        match (self, other) {
            (
                Type::Integer | Type::Rational | Type::Real | Type::Number,
                Type::Integer | Type::Rational | Type::Real | Type::Number,
            ) => Type::Number,
            (Type::List(a), Type::List(b)) => Type::list(a.lub(b)),
            (Type::Set(a), Type::Set(b)) => Type::set(a.lub(b)),
            (Type::Map(ka, va), Type::Map(kb, vb)) => Type::map(ka.lub(kb), va.lub(vb)),
            (Type::Tuple(a), Type::Tuple(b)) if a.fields.len() == b.fields.len() => {
                let fields = a
                    .fields
                    .iter()
                    .zip(&b.fields)
                    .map(|(x, y)| x.lub(y))
                    .collect();
                Type::tuple(fields)
            }
            (Type::Constructor(a), Type::Constructor(b)) if a.adt == b.adt => {
                Type::Adt(a.adt.clone())
            }
            (Type::Constructor(c), Type::Adt(a)) | (Type::Adt(a), Type::Constructor(c))
                if c.adt == *a =>
            {
                Type::Adt(a.clone())
            }
            (
                Type::Node | Type::Adt(_) | Type::Constructor(_),
                Type::Node | Type::Adt(_) | Type::Constructor(_),
            ) => Type::Node,
            _ => Type::Value,
        }
    }

    /// Key and value types of a map type, when this is one.
    pub(crate) fn map_types(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Map(k, v) => Some((k, v)),
            _ => None,
        }
    }

    /// Field types of a tuple type, when this is one.
    pub(crate) fn tuple_fields(&self) -> Option<&[Type]> {
        match self {
            Type::Tuple(t) => Some(&t.fields),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Value => write!(f, "value"),
            Type::Void => write!(f, "void"),
            Type::Number => write!(f, "num"),
            Type::Integer => write!(f, "int"),
            Type::Rational => write!(f, "rat"),
            Type::Real => write!(f, "real"),
            Type::Boolean => write!(f, "bool"),
            Type::String => write!(f, "str"),
            Type::DateTime => write!(f, "datetime"),
            Type::SourceLocation => write!(f, "loc"),
            Type::List(e) => write!(f, "list[{}]", e),
            Type::Set(e) => write!(f, "set[{}]", e),
            Type::Map(k, v) => write!(f, "map[{},{}]", k, v),
            Type::Tuple(t) => {
                write!(f, "tuple[")?;
                for (i, field) in t.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "]")
            }
            Type::Node => write!(f, "node"),
            Type::Adt(a) => write!(f, "{}", a.name),
            Type::Constructor(c) => write!(f, "{} {}", c.adt.name, c.name),
        }
    }
}

// ============================================================================
// TypeStore
// ============================================================================

/// A store of declared abstract data types and constructors.
///
/// The reader consults the store to resolve constructor names against an
/// expected type; unresolved names fall back to untyped nodes.
#[derive(Default, Debug)]
pub struct TypeStore {
    adts: HashMap<std::string::String, Arc<AdtType>>,
    constructors: HashMap<std::string::String, Vec<Arc<ConstructorType>>>,
}

impl TypeStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        TypeStore::default()
    }

    /// Declares (or retrieves) an abstract data type.
    pub fn declare_adt(&mut self, name: impl Into<std::string::String>) -> Type {
        let name = name.into();
        let adt = self
            .adts
            .entry(name.clone())
            .or_insert_with(|| Arc::new(AdtType { name }))
            .clone();
        Type::Adt(adt)
    }

    /// Declares a constructor for an already-declared ADT.
    pub fn declare_constructor(
        &mut self,
        adt_name: &str,
        name: impl Into<std::string::String>,
        fields: Vec<Type>,
    ) -> Result<Type> {
        self.declare_constructor_full(adt_name, name, fields, None, Vec::new())
    }

    /// Declares a constructor with field labels and keyword parameters.
    pub fn declare_constructor_full(
        &mut self,
        adt_name: &str,
        name: impl Into<std::string::String>,
        fields: Vec<Type>,
        field_labels: Option<Vec<std::string::String>>,
        keyword_parameters: Vec<(std::string::String, Type)>,
    ) -> Result<Type> {
        let adt = self
            .adts
            .get(adt_name)
            .cloned()
            .ok_or_else(|| Error::UndeclaredConstructor(adt_name.to_string()))?;
        let name = name.into();
        let constructor = Arc::new(ConstructorType {
            adt,
            name: name.clone(),
            fields,
            field_labels,
            keyword_parameters,
        });
        self.constructors
            .entry(name)
            .or_default()
            .push(constructor.clone());
        Ok(Type::Constructor(constructor))
    }

    /// All constructors named `name` belonging to `adt`.
    #[must_use]
    pub fn lookup_constructor(&self, adt: &AdtType, name: &str) -> Vec<Arc<ConstructorType>> {
        self.constructors
            .get(name)
            .map(|candidates| {
                candidates
                    .iter()
                    .filter(|c| c.adt.as_ref() == adt)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first constructor named `name` whose fields admit `arg_types`.
    #[must_use]
    pub fn lookup_first_constructor(
        &self,
        name: &str,
        arg_types: &[Type],
    ) -> Option<Arc<ConstructorType>> {
        self.constructors.get(name).and_then(|candidates| {
            candidates
                .iter()
                .find(|c| {
                    c.fields.len() == arg_types.len()
                        && arg_types
                            .iter()
                            .zip(&c.fields)
                            .all(|(a, f)| a.is_subtype_of(f))
                })
                .cloned()
        })
    }
}
