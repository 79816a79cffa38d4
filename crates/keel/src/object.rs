//! The public mirror of runtime values.
//!
//! Evaluation results are snapshotted into this owned type at the API
//! boundary, so callers never hold references into the managed heap.

use std::fmt;

/// An owned snapshot of an evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Any other heap object, identified by its class name.
    Instance {
        /// The object's class name, e.g. `"Structure"`.
        class: String,
    },
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{}", crate::value::format_float(*v)),
            Self::Str(v) => write!(f, "{v}"),
            Self::Instance { class } => write!(f, "<{class}>"),
        }
    }
}

/// Error for conversions from [`Object`] into a concrete Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongType {
    /// The kind the object actually was.
    pub actual: &'static str,
}

impl fmt::Display for WrongType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value is a {}", self.actual)
    }
}

impl std::error::Error for WrongType {}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Instance { .. } => "object",
        }
    }
}

impl TryFrom<&Object> for i64 {
    type Error = WrongType;

    fn try_from(value: &Object) -> Result<Self, WrongType> {
        match value {
            Object::Int(v) => Ok(*v),
            other => Err(WrongType { actual: other.kind() }),
        }
    }
}

impl TryFrom<&Object> for f64 {
    type Error = WrongType;

    fn try_from(value: &Object) -> Result<Self, WrongType> {
        match value {
            Object::Float(v) => Ok(*v),
            other => Err(WrongType { actual: other.kind() }),
        }
    }
}

impl TryFrom<&Object> for bool {
    type Error = WrongType;

    fn try_from(value: &Object) -> Result<Self, WrongType> {
        match value {
            Object::Bool(v) => Ok(*v),
            other => Err(WrongType { actual: other.kind() }),
        }
    }
}

impl TryFrom<&Object> for String {
    type Error = WrongType;

    fn try_from(value: &Object) -> Result<Self, WrongType> {
        match value {
            Object::Str(v) => Ok(v.clone()),
            other => Err(WrongType { actual: other.kind() }),
        }
    }
}
