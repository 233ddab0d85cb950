//! Error types for record operations.

use crate::session::SessionError;
use crate::value::AttributeError;
use serde_json::Value;

/// Error type for the CRUD verbs and mass-assignment
#[derive(Debug)]
pub enum RecordError {
    /// Mass-assignment key outside the settable attribute set
    UnknownAttribute {
        model: &'static str,
        attribute: String,
    },
    /// `find_or_fail` found no record for the id
    NotFound { model: &'static str, id: Value },
    /// A value the model's setter cannot accept
    InvalidValue {
        model: &'static str,
        attribute: String,
        expected: &'static str,
        actual: String,
    },
    /// Mutation that requires a persisted instance was called on a transient one
    PrimaryKeyRequired { model: &'static str },
    /// Session lifecycle or backend failure, propagated unchanged
    Session(SessionError),
}

impl RecordError {
    /// Lift an attribute-level failure into a record error for `model`.
    pub(crate) fn attribute(model: &'static str, err: AttributeError) -> Self {
        match err {
            AttributeError::Unknown { attribute } => {
                RecordError::UnknownAttribute { model, attribute }
            }
            AttributeError::TypeMismatch {
                attribute,
                expected,
                actual,
            } => RecordError::InvalidValue {
                model,
                attribute,
                expected,
                actual,
            },
        }
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::UnknownAttribute { model, attribute } => {
                write!(f, "unknown attribute {attribute} for model {model}")
            }
            RecordError::NotFound { model, id } => {
                write!(f, "no {model} record found with primary key {id}")
            }
            RecordError::InvalidValue {
                model,
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "invalid value for {model}.{attribute}: expected {expected}, got {actual}"
            ),
            RecordError::PrimaryKeyRequired { model } => {
                write!(f, "primary key is required to mutate a {model} record")
            }
            RecordError::Session(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for RecordError {
    fn from(err: SessionError) -> Self {
        RecordError::Session(err)
    }
}
