//! CRUD verbs and session access for model types.
//!
//! Two capability traits, blanket-implemented for every [`Model`]:
//!
//! - [`SessionAccess`] — the session lifecycle component: `bind`,
//!   `scoped_session`, `transaction`, `query`.
//! - [`ActiveRecord`] — the record operations component: `fill`, `save`,
//!   `create`, `update`, `delete`, `destroy`, `all`, `first`, `find`,
//!   `find_or_fail`.
//!
//! Every verb opens its own scope, delegates persistence to the bound
//! [`SessionFactory`], and guarantees commit-or-rollback plus release before
//! returning.

mod error;

pub use error::RecordError;

use crate::model::{Attributes, Model};
use crate::query::Query;
use crate::registry;
use crate::session::{ScopedSession, SessionError, SessionFactory};
use serde_json::Value;
use std::sync::Arc;

/// Session lifecycle operations, available on every model type.
pub trait SessionAccess: Model {
    /// Bind the connection factory for this model type.
    ///
    /// Must be called before any other operation; binding again replaces the
    /// factory. Rebinding while scopes are in flight is the caller's
    /// responsibility.
    fn bind(factory: Arc<dyn SessionFactory>) {
        registry::bind::<Self>(factory);
    }

    /// Open a fresh session scope with no automatic transactional wrapping.
    ///
    /// The caller drives commit/rollback explicitly; the session is still
    /// released when the scope drops, and an open scope rolls back on drop.
    fn scoped_session() -> Result<ScopedSession, SessionError> {
        let factory = registry::factory_for::<Self>()?;
        Ok(ScopedSession::new(factory.open_session()?))
    }

    /// Run `body` inside a dedicated transactional scope.
    ///
    /// On `Ok` the scope commits (a failed commit rolls back and returns the
    /// commit error); on `Err` the scope rolls back and the same error is
    /// propagated. The session is released on every exit path.
    fn transaction<T, E, F>(body: F) -> Result<T, E>
    where
        E: From<SessionError>,
        F: FnOnce(&mut ScopedSession) -> Result<T, E>,
    {
        let mut scope = Self::scoped_session().map_err(E::from)?;
        match body(&mut scope) {
            Ok(value) => {
                if !scope.is_open() {
                    // body already drove the scope to a terminal state
                    return Ok(value);
                }
                match scope.commit() {
                    Ok(()) => Ok(value),
                    Err(commit_err) => {
                        let _ = scope.rollback();
                        Err(E::from(commit_err))
                    }
                }
            }
            Err(err) => {
                if scope.is_open() {
                    let _ = scope.rollback();
                }
                Err(err)
            }
        }
    }

    /// Query handle for this model type.
    ///
    /// The factory is resolved eagerly here; each terminal call on the handle
    /// opens, materializes, commits, and releases its own session, so no lazy
    /// evaluation ever outlives a session.
    fn query() -> Result<Query<Self>, SessionError> {
        Ok(Query::new(registry::factory_for::<Self>()?))
    }
}

impl<M: Model> SessionAccess for M {}

/// ActiveRecord-style CRUD verbs, available on every model type.
pub trait ActiveRecord: SessionAccess {
    /// The attribute names mass-assignment is permitted to write: persisted
    /// columns, hybrid properties, and settable relations.
    fn settable_attributes() -> Vec<&'static str> {
        let mut names = Vec::with_capacity(
            Self::columns().len()
                + Self::hybrid_properties().len()
                + Self::settable_relations().len(),
        );
        names.extend_from_slice(Self::columns());
        names.extend_from_slice(Self::hybrid_properties());
        names.extend_from_slice(Self::settable_relations());
        names
    }

    /// Mass-assign `attributes` onto this instance.
    ///
    /// Keys are applied in map order (sorted by key). The first key outside
    /// the settable set fails with [`RecordError::UnknownAttribute`] naming
    /// it; keys applied before the failing one remain applied. Returns the
    /// instance for chaining.
    fn fill(&mut self, attributes: Attributes) -> Result<&mut Self, RecordError> {
        let settable = Self::settable_attributes();
        let model = Self::meta().model;
        for (name, value) in attributes {
            if !settable.iter().any(|candidate| *candidate == name) {
                return Err(RecordError::UnknownAttribute {
                    model,
                    attribute: name,
                });
            }
            self.set_attr(&name, value)
                .map_err(|err| RecordError::attribute(model, err))?;
        }
        Ok(self)
    }

    /// Persist this instance (insert or update) and refresh it from the
    /// stored row, including any store-generated primary key.
    ///
    /// Uses a caller-managed scope: stage, reload the staged row, commit,
    /// then apply the reloaded row onto the instance. Any failure before the
    /// terminal operation rolls back and re-raises; the session is released
    /// on every path.
    fn save(&mut self) -> Result<&mut Self, RecordError> {
        let meta = Self::meta();
        let mut scope = Self::scoped_session()?;
        let outcome = (|| {
            let staged = scope.stage(meta, self.to_attributes())?;
            let row = scope.reload(meta, staged)?;
            scope.commit()?;
            Ok::<Attributes, SessionError>(row)
        })();
        match outcome {
            Ok(row) => {
                self.apply_attributes(&row)
                    .map_err(|err| RecordError::attribute(meta.model, err))?;
                log::debug!("saved {} record", meta.model);
                Ok(self)
            }
            Err(err) => {
                if scope.is_open() {
                    let _ = scope.rollback();
                }
                Err(err.into())
            }
        }
    }

    /// Instantiate, `fill`, and `save` a new record.
    fn create(attributes: Attributes) -> Result<Self, RecordError> {
        let mut record = Self::default();
        record.fill(attributes)?;
        record.save()?;
        Ok(record)
    }

    /// `fill` then `save` on an existing instance.
    fn update(&mut self, attributes: Attributes) -> Result<&mut Self, RecordError> {
        self.fill(attributes)?;
        self.save()
    }

    /// Delete this record inside a transactional scope.
    ///
    /// Consumes the instance: it is invalid for further use once the scope
    /// commits. Fails with [`RecordError::PrimaryKeyRequired`] on a transient
    /// instance.
    fn delete(self) -> Result<(), RecordError> {
        let meta = Self::meta();
        let id = self
            .primary_key()
            .ok_or(RecordError::PrimaryKeyRequired { model: meta.model })?;
        Self::transaction(|scope| {
            scope.stage_delete(meta, &id)?;
            log::debug!("deleted {} record {}", meta.model, id);
            Ok::<(), RecordError>(())
        })
    }

    /// Delete the records with the given ids inside one transactional scope.
    ///
    /// Ids with no matching record are silently skipped. Pending deletes are
    /// flushed once after all ids are processed; a failure partway rolls back
    /// the entire batch.
    fn destroy<I>(ids: I) -> Result<(), RecordError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let meta = Self::meta();
        Self::transaction(|scope| {
            for id in ids {
                let id = id.into();
                if scope.get(meta, &id)?.is_some() {
                    scope.stage_delete(meta, &id)?;
                } else {
                    log::debug!("destroy: no {} record {}, skipping", meta.model, id);
                }
            }
            scope.flush()?;
            Ok::<(), RecordError>(())
        })
    }

    /// Every record of this type, backing-store order.
    fn all() -> Result<Vec<Self>, RecordError> {
        Self::query()?.all()
    }

    /// The first record by backing-store default ordering, if any.
    fn first() -> Result<Option<Self>, RecordError> {
        Self::query()?.first()
    }

    /// The record with the given primary key; absence is a normal result.
    fn find<V: Into<Value>>(id: V) -> Result<Option<Self>, RecordError> {
        Self::query()?.get(id)
    }

    /// Like [`find`](ActiveRecord::find), but absence fails with
    /// [`RecordError::NotFound`] carrying the model name and id.
    fn find_or_fail<V: Into<Value>>(id: V) -> Result<Self, RecordError> {
        let id = id.into();
        Self::find(id.clone())?.ok_or_else(|| RecordError::NotFound {
            model: Self::meta().model,
            id,
        })
    }
}

impl<M: Model> ActiveRecord for M {}
