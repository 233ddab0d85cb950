//! Query handle with eager, per-call evaluation.
//!
//! A `Query<M>` captures the factory resolved when the handle was built; it
//! holds no open session. Each terminal call (`all`, `first`, `get`) opens a
//! fresh session, materializes its results, commits, and releases before
//! returning, so the handle stays usable across calls and observes later
//! writes.

use crate::active_record::RecordError;
use crate::model::Model;
use crate::session::{ScopedSession, SessionError, SessionFactory};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Query<M: Model> {
    factory: Arc<dyn SessionFactory>,
    marker: PhantomData<fn() -> M>,
}

impl<M: Model> Query<M> {
    pub(crate) fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Query {
            factory,
            marker: PhantomData,
        }
    }

    fn with_session<T, F>(&self, body: F) -> Result<T, RecordError>
    where
        F: FnOnce(&mut ScopedSession) -> Result<T, SessionError>,
    {
        let mut scope = ScopedSession::new(self.factory.open_session()?);
        match body(&mut scope) {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(err) => {
                let _ = scope.rollback();
                Err(err.into())
            }
        }
    }

    fn decode(row: &crate::model::Attributes) -> Result<M, RecordError> {
        M::from_attributes(row).map_err(|err| RecordError::attribute(M::meta().model, err))
    }

    /// All records, backing-store order.
    pub fn all(&self) -> Result<Vec<M>, RecordError> {
        let rows = self.with_session(|scope| scope.all(M::meta()))?;
        rows.iter().map(Self::decode).collect()
    }

    /// First record by backing-store default ordering.
    pub fn first(&self) -> Result<Option<M>, RecordError> {
        let row = self.with_session(|scope| scope.first(M::meta()))?;
        row.as_ref().map(Self::decode).transpose()
    }

    /// Record with the given primary key; `None` when absent.
    pub fn get<V: Into<Value>>(&self, id: V) -> Result<Option<M>, RecordError> {
        let id = id.into();
        let row = self.with_session(|scope| scope.get(M::meta(), &id))?;
        row.as_ref().map(Self::decode).transpose()
    }
}
