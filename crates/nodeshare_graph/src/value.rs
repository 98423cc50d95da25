// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values stored in documents and values read from live host objects.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for floats.
pub const FLOAT_PRECISION: i32 = 5;

/// Round a float to [`FLOAT_PRECISION`] decimal places.
pub fn round_float(value: f64) -> f64 {
    let scale = 10f64.powi(FLOAT_PRECISION);
    let rounded = (value * scale).round() / scale;
    // -0.0 would serialize as "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A value as it appears in a document.
///
/// Serialized untagged so a document reads as plain JSON: `true`, `3`,
/// `0.5`, `"text"`, `[0.8, 0.8, 0.8, 1.0]`. `Map` only appears for fields
/// this crate does not understand and carries through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Text(String),
    /// Fixed-size tuple (vectors, colors)
    Tuple(Vec<Value>),
    /// Unknown structured value
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Build a tuple of floats.
    pub fn floats(values: impl IntoIterator<Item = f64>) -> Self {
        Self::Tuple(values.into_iter().map(Self::Float).collect())
    }

    /// Whether this is a bool, number or string.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_))
    }

    /// Numeric view (ints widen to floats).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Bool view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric tuple view.
    pub fn as_floats(&self) -> Option<Vec<f64>> {
        match self {
            Self::Tuple(items) => items.iter().map(Self::as_f64).collect(),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A host object referenced by an attribute (a frame, an image, a panel).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRef {
    /// Display name, when the object has one
    pub name: Option<String>,
    /// Identifier that survives reordering, when the object has one
    pub persistent_uid: Option<i64>,
}

impl ObjectRef {
    /// Reference by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            persistent_uid: None,
        }
    }

    /// Reference by persistent identifier.
    pub fn uid(uid: i64) -> Self {
        Self {
            name: None,
            persistent_uid: Some(uid),
        }
    }
}

/// A live attribute value as the host exposes it.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Unset / null
    None,
    /// Boolean
    Bool(bool),
    /// Integer or enum index
    Int(i64),
    /// Float
    Float(f64),
    /// String or enum identifier
    Text(String),
    /// Anything iterable: vectors, colors, arrays
    Sequence(Vec<HostValue>),
    /// Reference to another host object
    Object(ObjectRef),
    /// A value with no useful representation
    Opaque,
}

impl HostValue {
    /// Build a float vector.
    pub fn floats(values: impl IntoIterator<Item = f64>) -> Self {
        Self::Sequence(values.into_iter().map(Self::Float).collect())
    }

    /// Primitive conversion, rounding floats. `None` for non-primitives.
    pub fn to_primitive(&self) -> Option<Value> {
        match self {
            Self::Float(v) => Some(Value::Float(round_float(*v))),
            other => other.to_scalar(),
        }
    }

    /// Primitive conversion, keeping floats as they are.
    pub fn to_scalar(&self) -> Option<Value> {
        match self {
            Self::Bool(v) => Some(Value::Bool(*v)),
            Self::Int(v) => Some(Value::Int(*v)),
            Self::Float(v) => Some(Value::Float(*v)),
            Self::Text(v) => Some(Value::Text(v.clone())),
            _ => None,
        }
    }

    /// Tuple conversion of a sequence, rounding floats.
    ///
    /// Fails if any element is itself not representable.
    pub fn to_tuple(&self) -> Option<Value> {
        let Self::Sequence(items) = self else {
            return None;
        };
        items
            .iter()
            .map(|item| item.to_primitive().or_else(|| item.to_tuple()))
            .collect::<Option<Vec<_>>>()
            .map(Value::Tuple)
    }

    /// Name of a referenced object.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            Self::Object(obj) => obj.name.as_deref(),
            _ => None,
        }
    }
}
