//! Portable value model for arguments, results, and context entries.
//!
//! Every argument crossing the boundary is a [`Value`]. Its [`TypeTag`] is the
//! runtime type the dispatcher matches against declared parameter types.
//! Application-defined types travel as records carrying their type name; see
//! [`remote_type!`](crate::remote_type).

use crate::error::{CarmineError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A value that can be carried inside an invocation envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Application-defined structure, identified by its type name.
    Record {
        type_name: String,
        fields: BTreeMap<String, Value>,
    },
}

/// Runtime type of a non-null [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Map,
    Record(String),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Str => write!(f, "string"),
            TypeTag::Bytes => write!(f, "bytes"),
            TypeTag::List => write!(f, "list"),
            TypeTag::Map => write!(f, "map"),
            TypeTag::Record(name) => write!(f, "{}", name),
        }
    }
}

impl Value {
    /// Runtime type of this value. `Null` has none and matches no parameter.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeTag::Bool),
            Value::Int(_) => Some(TypeTag::Int),
            Value::Float(_) => Some(TypeTag::Float),
            Value::Str(_) => Some(TypeTag::Str),
            Value::Bytes(_) => Some(TypeTag::Bytes),
            Value::List(_) => Some(TypeTag::List),
            Value::Map(_) => Some(TypeTag::Map),
            Value::Record { type_name, .. } => Some(TypeTag::Record(type_name.clone())),
        }
    }

    /// Human-readable runtime type, `"null"` for [`Value::Null`].
    pub fn kind_name(&self) -> String {
        self.type_tag()
            .map(|tag| tag.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Build a record value from any serde-serializable structure.
    ///
    /// The structure must serialize to a map (a struct or a map type).
    pub fn from_serializable<T: Serialize>(type_name: &str, value: &T) -> Result<Value> {
        let json = serde_json::to_value(value).map_err(|e| CarmineError::Encode {
            message: format!("Failed to serialize {}: {}", type_name, e),
        })?;
        match from_json(json)? {
            Value::Map(fields) => Ok(Value::Record {
                type_name: type_name.to_string(),
                fields,
            }),
            other => Err(CarmineError::Encode {
                message: format!(
                    "{} must serialize to a map, got {}",
                    type_name,
                    other.kind_name()
                ),
            }),
        }
    }

    /// Deserialize a record of the given type name back into a structure.
    pub fn into_record_of<T: DeserializeOwned>(self, expected: &str) -> Result<T> {
        match self {
            Value::Record { type_name, fields } if type_name == expected => {
                serde_json::from_value(to_json(&Value::Map(fields))).map_err(|e| {
                    CarmineError::type_mismatch(expected, format!("malformed record: {}", e))
                })
            }
            other => Err(CarmineError::type_mismatch(expected, other.kind_name())),
        }
    }

    /// Check that the value can be written to the wire.
    ///
    /// JSON has no representation for NaN or infinities.
    pub fn ensure_encodable(&self) -> Result<()> {
        match self {
            Value::Float(f) if !f.is_finite() => Err(CarmineError::Encode {
                message: format!("non-finite float {} cannot be encoded", f),
            }),
            Value::List(items) => items.iter().try_for_each(Value::ensure_encodable),
            Value::Map(fields) | Value::Record { fields, .. } => {
                fields.values().try_for_each(Value::ensure_encodable)
            }
            _ => Ok(()),
        }
    }
}

/// Integers outside the `i64` range have no `Int` form and are refused
/// rather than degraded to floats.
fn from_json(json: serde_json::Value) -> Result<Value> {
    let value = match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if n.is_u64() {
                return Err(CarmineError::Encode {
                    message: format!("integer {} exceeds the int range", n),
                });
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| CarmineError::Encode {
                        message: format!("number {} has no portable form", n),
                    })?
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::List(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_json::Value::Object(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(key, value)| from_json(value).map(|value| (key, value)))
                .collect::<Result<BTreeMap<_, _>>>()?,
        ),
    };
    Ok(value)
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::Array(
            b.iter()
                .map(|byte| serde_json::Value::Number((*byte).into()))
                .collect(),
        ),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) | Value::Record { fields, .. } => serde_json::Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

// ============================================================================
// Conversion traits
// ============================================================================

/// Conversion of a Rust value into a transportable [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Result<Value>;
}

/// Conversion of a transported [`Value`] back into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

/// Declared parameter type of a Rust type, used to build method tables.
pub trait ValueType {
    fn type_tag() -> TypeTag;
}

impl IntoValue for Value {
    fn into_value(self) -> Result<Value> {
        Ok(self)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Null)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(CarmineError::type_mismatch("null", other.kind_name())),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Bool(self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(CarmineError::type_mismatch("bool", other.kind_name())),
        }
    }
}

impl ValueType for bool {
    fn type_tag() -> TypeTag {
        TypeTag::Bool
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {$(
        impl IntoValue for $ty {
            fn into_value(self) -> Result<Value> {
                i64::try_from(self)
                    .map(Value::Int)
                    .map_err(|_| {
                        CarmineError::type_mismatch("int", format!("{} {}", stringify!($ty), self))
                    })
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                        CarmineError::type_mismatch(stringify!($ty), format!("int {}", i))
                    }),
                    other => Err(CarmineError::type_mismatch(stringify!($ty), other.kind_name())),
                }
            }
        }

        impl ValueType for $ty {
            fn type_tag() -> TypeTag {
                TypeTag::Int
            }
        }
    )*};
}

int_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl IntoValue for f64 {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Float(self))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(CarmineError::type_mismatch("float", other.kind_name())),
        }
    }
}

impl ValueType for f64 {
    fn type_tag() -> TypeTag {
        TypeTag::Float
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Float(self.into()))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl ValueType for f32 {
    fn type_tag() -> TypeTag {
        TypeTag::Float
    }
}

impl IntoValue for String {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Str(self))
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Str(self.to_string()))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(CarmineError::type_mismatch("string", other.kind_name())),
        }
    }
}

impl ValueType for String {
    fn type_tag() -> TypeTag {
        TypeTag::Str
    }
}

impl IntoValue for Bytes {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Bytes(self.to_vec()))
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(Bytes::from(b)),
            other => Err(CarmineError::type_mismatch("bytes", other.kind_name())),
        }
    }
}

impl ValueType for Bytes {
    fn type_tag() -> TypeTag {
        TypeTag::Bytes
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Result<Value> {
        match self {
            Some(inner) => inner.into_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// A `None` argument is sent as null and therefore never matches a parameter.
impl<T: ValueType> ValueType for Option<T> {
    fn type_tag() -> TypeTag {
        T::type_tag()
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Result<Value> {
        self.into_iter()
            .map(IntoValue::into_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(CarmineError::type_mismatch("list", other.kind_name())),
        }
    }
}

impl<T> ValueType for Vec<T> {
    fn type_tag() -> TypeTag {
        TypeTag::List
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Result<Value> {
        self.into_iter()
            .map(|(key, value)| value.into_value().map(|value| (key, value)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Map)
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(fields) => fields
                .into_iter()
                .map(|(key, value)| T::from_value(value).map(|value| (key, value)))
                .collect(),
            other => Err(CarmineError::type_mismatch("map", other.kind_name())),
        }
    }
}

impl<T> ValueType for BTreeMap<String, T> {
    fn type_tag() -> TypeTag {
        TypeTag::Map
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn into_value(self) -> Result<Value> {
        self.into_iter()
            .map(|(key, value)| value.into_value().map(|value| (key, value)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Map)
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self> {
        BTreeMap::<String, T>::from_value(value).map(|fields| fields.into_iter().collect())
    }
}

impl<T> ValueType for HashMap<String, T> {
    fn type_tag() -> TypeTag {
        TypeTag::Map
    }
}

/// Make a serde type transportable as an application-defined record.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Person { name: String, age: u32 }
///
/// carmine_core::remote_type!(Person => "demo.Person");
/// ```
#[macro_export]
macro_rules! remote_type {
    ($ty:ty => $name:literal) => {
        impl $crate::IntoValue for $ty {
            fn into_value(self) -> $crate::Result<$crate::Value> {
                $crate::Value::from_serializable($name, &self)
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                value.into_record_of($name)
            }
        }

        impl $crate::ValueType for $ty {
            fn type_tag() -> $crate::TypeTag {
                $crate::TypeTag::Record($name.to_string())
            }
        }
    };
}
