//! Type descriptors: the abstract data shapes the compiler consumes.
//!
//! Descriptors are built once per concrete shape used by the API, either by
//! hand or by build tooling, and never inspect runtime type machinery. They
//! are immutable for the life of a compilation pass.

use std::fmt;

use schemata_core::Schema;
use serde::{Deserialize, Serialize};

/// Stable `(namespace, local name)` pair used for naming and memoization.
///
/// An empty local name marks an anonymous shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub namespace: String,
    pub local_name: String,
}

impl Identity {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Identity of a shape with no name at all
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            namespace: String::new(),
            local_name: String::new(),
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.local_name.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.namespace.is_empty(), self.is_anonymous()) {
            (_, true) => write!(f, "<anonymous>"),
            (true, false) => write!(f, "{}", self.local_name),
            (false, false) => write!(f, "{}.{}", self.namespace, self.local_name),
        }
    }
}

/// Scalar kinds with a direct schema equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
}

impl PrimitiveKind {
    /// Fresh inline schema for this kind
    #[must_use]
    pub fn schema(self) -> Schema {
        match self {
            Self::String => Schema::string(),
            Self::Integer => Schema::integer(),
            Self::Float => Schema::number(),
            Self::Boolean => Schema::boolean(),
        }
    }
}

/// Base kind of an enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumBase {
    String,
    Integer,
}

/// One literal allowed by an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Integer(i64),
    String(String),
}

impl EnumValue {
    #[must_use]
    pub const fn base(&self) -> EnumBase {
        match self {
            Self::Integer(_) => EnumBase::Integer,
            Self::String(_) => EnumBase::String,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::String(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for EnumValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for EnumValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// A named, typed member of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Wire name (serialization name, defaulting to the declared name)
    pub name: String,
    pub shape: TypeDescriptor,
    /// Splice the record's properties into the owner instead of nesting them
    pub embedded: bool,
    /// Serialization omits the field when empty or default
    pub omit_empty: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            shape,
            embedded: false,
            omit_empty: false,
        }
    }

    /// Anonymous embedding of a record; the field takes the record's local name.
    #[must_use]
    pub fn embed(shape: TypeDescriptor) -> Self {
        let name = shape
            .identity()
            .map(|identity| identity.local_name.clone())
            .unwrap_or_default();
        Self {
            name,
            shape,
            embedded: true,
            omit_empty: false,
        }
    }

    /// Mark the field as omitted from the payload when empty
    #[must_use]
    pub const fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    /// A field is required unless it is optional or omittable.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.omit_empty && !self.shape.is_optional()
    }
}

/// Abstract description of a data shape
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    /// May be absent at runtime
    Optional(Box<TypeDescriptor>),
    /// Ordered, variable-length collection
    Sequence(Box<TypeDescriptor>),
    /// Keyed mapping; only text keys compile
    Dictionary {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    /// Enumeration; empty `values` are looked up from the metadata provider
    Enum {
        identity: Identity,
        base: EnumBase,
        values: Vec<EnumValue>,
    },
    Record {
        identity: Identity,
        fields: Vec<Field>,
    },
    /// Externally known shape with a pre-resolved schema
    KnownAlias { identity: Identity, schema: Schema },
    /// Reference to a record or enum defined elsewhere in the same pass; this
    /// is how recursive graphs are written
    Named(Identity),
    /// A shape with no schema rule (functions, channels, complex numbers)
    Unsupported(String),
}

impl TypeDescriptor {
    #[must_use]
    pub const fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::Primitive(PrimitiveKind::Integer)
    }

    #[must_use]
    pub const fn float() -> Self {
        Self::Primitive(PrimitiveKind::Float)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Primitive(PrimitiveKind::Boolean)
    }

    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn sequence(element: Self) -> Self {
        Self::Sequence(Box::new(element))
    }

    #[must_use]
    pub fn dictionary(key: Self, value: Self) -> Self {
        Self::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// String-keyed dictionary
    #[must_use]
    pub fn string_map(value: Self) -> Self {
        Self::dictionary(Self::string(), value)
    }

    #[must_use]
    pub const fn record(identity: Identity, fields: Vec<Field>) -> Self {
        Self::Record { identity, fields }
    }

    #[must_use]
    pub const fn enumeration(identity: Identity, base: EnumBase, values: Vec<EnumValue>) -> Self {
        Self::Enum {
            identity,
            base,
            values,
        }
    }

    /// Forward reference to the record or enum named `identity`
    #[must_use]
    pub const fn named(identity: Identity) -> Self {
        Self::Named(identity)
    }

    #[must_use]
    pub const fn alias(identity: Identity, schema: Schema) -> Self {
        Self::KnownAlias { identity, schema }
    }

    /// Timestamps are text with a `date-time` format marker.
    #[must_use]
    pub fn timestamp() -> Self {
        Self::alias(
            Identity::new("time", "Time"),
            Schema::formatted_string("date-time"),
        )
    }

    /// Calendar dates are text with a `date` format marker.
    #[must_use]
    pub fn date() -> Self {
        Self::alias(Identity::new("time", "Date"), Schema::formatted_string("date"))
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Identity of named shapes (records, enums, aliases)
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Enum { identity, .. }
            | Self::Record { identity, .. }
            | Self::KnownAlias { identity, .. }
            | Self::Named(identity) => Some(identity),
            _ => None,
        }
    }

    /// Whether values of this shape serialize as text (valid dictionary keys)
    #[must_use]
    pub fn is_text(&self) -> bool {
        match self {
            Self::Primitive(kind) => *kind == PrimitiveKind::String,
            Self::Enum { base, .. } => *base == EnumBase::String,
            Self::KnownAlias { schema, .. } => {
                schema.schema_type == Some(schemata_core::SchemaType::String)
            }
            _ => false,
        }
    }

    /// Short human label used in errors and logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(kind) => format!("{kind:?}").to_lowercase(),
            Self::Optional(inner) => format!("optional {}", inner.describe()),
            Self::Sequence(element) => format!("sequence of {}", element.describe()),
            Self::Dictionary { key, value } => {
                format!("map of {} to {}", key.describe(), value.describe())
            }
            Self::Enum { identity, .. } => format!("enum {identity}"),
            Self::Record { identity, .. } => format!("record {identity}"),
            Self::KnownAlias { identity, .. } => format!("alias {identity}"),
            Self::Named(identity) => format!("reference to {identity}"),
            Self::Unsupported(what) => what.clone(),
        }
    }
}
