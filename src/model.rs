//! Model trait: inspection descriptor plus dynamic attribute access.
//!
//! A model type describes its backing table (`ModelMeta`), enumerates its
//! persisted columns, computed (hybrid) properties, and directly-assignable
//! relations, and exposes attribute access by name. Everything the CRUD layer
//! knows about a model flows through this trait; implementations are written
//! by hand or generated by external codegen.

use crate::value::AttributeError;
use serde_json::Value;

/// Attribute map exchanged with backends and mass-assignment.
///
/// `serde_json::Map` iterates sorted by key, which makes mass-assignment
/// order deterministic.
pub type Attributes = serde_json::Map<String, Value>;

/// Static descriptor for a model type, shared with backend sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelMeta {
    /// Type name used in error messages
    pub model: &'static str,
    /// Backing table name
    pub table: &'static str,
    /// Primary key column name
    pub key: &'static str,
}

/// Trait implemented by model types.
///
/// Required methods describe the schema (`meta`, `columns`, optionally
/// `hybrid_properties` and `settable_relations`) and move values in and out
/// of the struct (`get_attr`, `set_attr`). Provided methods derive the
/// primary key, column snapshots, and row decoding from those.
pub trait Model: Default + Clone + Send + std::fmt::Debug + 'static {
    /// Static descriptor for this model type
    fn meta() -> &'static ModelMeta;

    /// Persisted column names, in schema order
    fn columns() -> &'static [&'static str];

    /// Computed properties that accept assignment (empty by default)
    fn hybrid_properties() -> &'static [&'static str] {
        &[]
    }

    /// Relation names that accept direct assignment (empty by default)
    fn settable_relations() -> &'static [&'static str] {
        &[]
    }

    /// Read an attribute by name; `None` if the name is unknown.
    ///
    /// Known-but-null attributes return `Some(Value::Null)`.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Assign an attribute by name.
    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), AttributeError>;

    /// The primary key value, or `None` while the instance is transient.
    fn primary_key(&self) -> Option<Value> {
        match self.get_attr(Self::meta().key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// Snapshot of all persisted columns as an attribute map.
    fn to_attributes(&self) -> Attributes {
        let mut row = Attributes::new();
        for column in Self::columns() {
            row.insert(
                (*column).to_string(),
                self.get_attr(column).unwrap_or(Value::Null),
            );
        }
        row
    }

    /// Apply a row's columns onto this instance (refresh after save, or load).
    ///
    /// Columns absent from `row` are left untouched.
    fn apply_attributes(&mut self, row: &Attributes) -> Result<(), AttributeError> {
        for column in Self::columns() {
            if let Some(value) = row.get(*column) {
                self.set_attr(column, value.clone())?;
            }
        }
        Ok(())
    }

    /// Decode a stored row into a fresh instance.
    fn from_attributes(row: &Attributes) -> Result<Self, AttributeError> {
        let mut instance = Self::default();
        instance.apply_attributes(row)?;
        Ok(instance)
    }
}
