//! Attribute value conversions.
//!
//! Models carry their attributes across the session seam as `serde_json::Value`.
//! This module provides the `AttributeValue` trait used by hand-written
//! `set_attr`/`get_attr` implementations to move between JSON values and the
//! model's field types, with typed mismatch errors.

use serde_json::Value;

/// Error raised while assigning a value to a model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The attribute name is not known to the model
    Unknown { attribute: String },
    /// The value cannot be converted to the attribute's field type
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        actual: String,
    },
}

impl std::fmt::Display for AttributeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeError::Unknown { attribute } => {
                write!(f, "unknown attribute: {attribute}")
            }
            AttributeError::TypeMismatch {
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "invalid value for attribute {attribute}: expected {expected}, got {actual}"
            ),
        }
    }
}

impl std::error::Error for AttributeError {}

/// Describe a JSON value's type for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Conversion between a model field type and the JSON attribute currency.
pub trait AttributeValue: Sized {
    /// Human-readable type name used in mismatch errors
    fn expected() -> &'static str;

    /// Convert from a JSON value; `None` on type mismatch
    fn from_value(value: &Value) -> Option<Self>;

    /// Convert the field back into a JSON value
    fn to_value(&self) -> Value;
}

impl AttributeValue for i64 {
    fn expected() -> &'static str {
        "integer"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl AttributeValue for i32 {
    fn expected() -> &'static str {
        "integer"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl AttributeValue for f64 {
    fn expected() -> &'static str {
        "number"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl AttributeValue for bool {
    fn expected() -> &'static str {
        "boolean"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl AttributeValue for String {
    fn expected() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(ToOwned::to_owned)
    }

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl<T: AttributeValue> AttributeValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

/// Coerce a JSON value into a field type, or report a typed mismatch.
///
/// Intended for hand-written `set_attr` implementations:
///
/// ```ignore
/// "name" => self.name = value::coerce("name", &value)?,
/// ```
pub fn coerce<T: AttributeValue>(attribute: &str, value: &Value) -> Result<T, AttributeError> {
    T::from_value(value).ok_or_else(|| AttributeError::TypeMismatch {
        attribute: attribute.to_string(),
        expected: T::expected(),
        actual: kind_of(value).to_string(),
    })
}
