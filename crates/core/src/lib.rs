//! mockdb core types: field values, records, composite record keys and the error taxonomy
//! shared by the schema index, the entity store and the synthetic generator.

#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use uuid::Uuid;

pub mod types;

pub use types::{Facets, FieldType};

pub mod prelude {
    pub use super::{Facets, FieldType, MockError, MockResult, Record, RecordKey, Value};
}

/// Errors surfaced by every mockdb component. Nothing is swallowed internally;
/// the request layer decides whether to log, retry or translate them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("duplicate key {key} in {collection}")]
    DuplicateKey { collection: String, key: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported field type: {0}")]
    UnsupportedFieldType(String),
    #[error("invalid input shape: {0}")]
    InvalidInputShape(String),
    #[error("invalid {ty} literal: {literal:?}")]
    InvalidLiteral { ty: String, literal: String },
    #[error("no navigation from {from} to {to}")]
    NavigationNotFound { from: String, to: String },
    #[error("schema: {0}")]
    Schema(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type MockResult<T> = Result<T, MockError>;

/// Runtime value of a single record field.
///
/// Floating point variants compare and hash by bit pattern so that values can take part
/// in record keys; `Decimal` compares numerically (`15.000 == 15`).
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Vec<u8>),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<Utc>),
    /// Time of day / duration (`Edm.Time`), e.g. `PT5H00M`.
    Time(chrono::Duration),
    Guid(Uuid),
    /// Keys of associated records held under a navigation property.
    Links(Vec<RecordKey>),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::SByte(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_links(&self) -> Option<&[RecordKey]> {
        match self {
            Value::Links(keys) => Some(keys.as_slice()),
            _ => None,
        }
    }

    /// Short type label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::SByte(_) => "sbyte",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Single(_) => "single",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::Time(_) => "time",
            Value::Guid(_) => "guid",
            Value::Links(_) => "links",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (SByte(a), SByte(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (Single(a), Single(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (DateTimeOffset(a), DateTimeOffset(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Guid(a), Guid(b)) => a == b,
            (Links(a), Links(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Byte(v) => v.hash(state),
            Value::SByte(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Single(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Binary(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::DateTimeOffset(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::Guid(v) => v.hash(state),
            Value::Links(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_literal()) }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Boolean(v) } }
impl From<u8> for Value { fn from(v: u8) -> Self { Value::Byte(v) } }
impl From<i8> for Value { fn from(v: i8) -> Self { Value::SByte(v) } }
impl From<i16> for Value { fn from(v: i16) -> Self { Value::Int16(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int32(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int64(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Single(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Double(v) } }
impl From<Decimal> for Value { fn from(v: Decimal) -> Self { Value::Decimal(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_string()) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<Vec<u8>> for Value { fn from(v: Vec<u8>) -> Self { Value::Binary(v) } }
impl From<Uuid> for Value { fn from(v: Uuid) -> Self { Value::Guid(v) } }
impl From<NaiveDateTime> for Value { fn from(v: NaiveDateTime) -> Self { Value::DateTime(v) } }
impl From<DateTime<Utc>> for Value { fn from(v: DateTime<Utc>) -> Self { Value::DateTimeOffset(v) } }

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

/// One stored entity instance: field name to value, in field insertion order.
///
/// Equality is map equality; field order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(n: usize) -> Self { Self { fields: IndexMap::with_capacity(n) } }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> { self.fields.get(name) }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> { self.fields.get_mut(name) }

    /// Set a field, returning the previous value. Existing fields keep their position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> { self.fields.shift_remove(name) }

    pub fn contains(&self, name: &str) -> bool { self.fields.contains_key(name) }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.fields.keys().map(|k| k.as_str()) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;
    fn into_iter(self) -> Self::IntoIter { self.fields.into_iter() }
}

/// Canonical composite key: `(field, value)` pairs sorted by field name.
///
/// Built from a record through a key descriptor; key fields missing from the record are
/// bound to `Value::Null`, so a malformed record still yields a (partial) key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordKey(SmallVec<[(String, Value); 2]>);

impl RecordKey {
    /// Extract the key of `record` for the given key descriptor.
    pub fn extract<S: AsRef<str>>(key_fields: &[S], record: &Record) -> Self {
        Self::from_pairs(key_fields.iter().map(|f| {
            let name = f.as_ref();
            (name.to_string(), record.get(name).cloned().unwrap_or(Value::Null))
        }))
    }

    /// Build a key from arbitrary pairs; a repeated field name keeps the last value.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut out: SmallVec<[(String, Value); 2]> = SmallVec::new();
        for (k, v) in pairs {
            let (k, v) = (k.into(), v.into());
            match out.iter_mut().find(|(name, _)| *name == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Self(out)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// True when every key field carries a non-null value.
    pub fn is_complete(&self) -> bool { !self.0.is_empty() && self.0.iter().all(|(_, v)| !v.is_null()) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> { self.0.iter().map(|(k, v)| (k.as_str(), v)) }

    pub fn to_record(&self) -> Record { self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect() }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(",")?; }
            match v {
                Value::String(s) => write!(f, "{}='{}'", k, s)?,
                other => write!(f, "{}={}", k, other.to_literal())?,
            }
        }
        f.write_str(")")
    }
}
