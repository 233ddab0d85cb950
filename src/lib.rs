//! # Registrar
//!
//! ActiveRecord-style convenience layer over pluggable mapping backends:
//! fluent CRUD verbs (`create`, `update`, `delete`, `destroy`, `find`, ...),
//! mass-assignment with attribute whitelisting, and transactional session
//! scoping with guaranteed commit-or-rollback and release.
//!
//! The mapping engine itself stays external: backends implement the
//! [`Session`]/[`SessionFactory`] seams, model types implement [`Model`],
//! and the blanket [`SessionAccess`]/[`ActiveRecord`] traits provide the
//! verbs on top. The in-memory [`MemoryBackend`] ships as a reference
//! backend for tests and experiments.
//!
//! ```
//! use registrar::{attrs, value, ActiveRecord, AttributeError, MemoryBackend};
//! use registrar::{Model, ModelMeta, RecordError, SessionAccess};
//! use serde_json::Value;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Task {
//!     id: Option<i64>,
//!     title: String,
//!     done: bool,
//! }
//!
//! static TASK_META: ModelMeta = ModelMeta {
//!     model: "Task",
//!     table: "tasks",
//!     key: "id",
//! };
//!
//! impl Model for Task {
//!     fn meta() -> &'static ModelMeta {
//!         &TASK_META
//!     }
//!
//!     fn columns() -> &'static [&'static str] {
//!         &["id", "title", "done"]
//!     }
//!
//!     fn get_attr(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "id" => Some(self.id.map_or(Value::Null, Value::from)),
//!             "title" => Some(Value::from(self.title.clone())),
//!             "done" => Some(Value::from(self.done)),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_attr(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
//!         match name {
//!             "id" => self.id = value::coerce(name, &value)?,
//!             "title" => self.title = value::coerce(name, &value)?,
//!             "done" => self.done = value::coerce(name, &value)?,
//!             _ => {
//!                 return Err(AttributeError::Unknown {
//!                     attribute: name.to_string(),
//!                 })
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), RecordError> {
//!     let backend = MemoryBackend::new();
//!     Task::bind(backend.factory());
//!
//!     let task = Task::create(attrs! { "title" => "write docs" })?;
//!     let id = task.id.unwrap();
//!
//!     let found = Task::find_or_fail(id)?;
//!     assert_eq!(found.title, "write docs");
//!
//!     Task::destroy([id])?;
//!     assert!(Task::all()?.is_empty());
//!     Ok(())
//! }
//! ```

pub mod active_record;
pub mod config;
mod macros;
pub mod memory;
pub mod model;
pub mod query;
mod registry;
pub mod session;
pub mod value;

pub use active_record::{ActiveRecord, RecordError, SessionAccess};
pub use config::DatabaseConfig;
pub use memory::{MemoryBackend, MemorySession};
pub use model::{Attributes, Model, ModelMeta};
pub use query::Query;
pub use session::{ScopedSession, Session, SessionError, SessionFactory, StagedId};
pub use value::{AttributeError, AttributeValue};

// Re-exported for macro expansion and so callers share one `Value` type.
pub use serde_json;
