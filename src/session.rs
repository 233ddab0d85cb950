//! Session seams and the transactional scope state machine.
//!
//! `Session` is the set of persistence primitives the CRUD layer sequences;
//! `SessionFactory` produces sessions on demand and is what `bind` stores per
//! model type. `ScopedSession` wraps one session in the single-use scope state
//! machine: `Open -> {Committed | RolledBack}`, exactly one terminal operation,
//! release guaranteed on every exit path (an open scope dropped without a
//! terminal operation rolls back).

use crate::model::{Attributes, ModelMeta};
use serde_json::Value;
use std::fmt;

/// Session lifecycle error type
#[derive(Debug)]
pub enum SessionError {
    /// No factory bound for the model type
    NotBound { model: &'static str },
    /// Scope reused after its terminal operation
    Closed,
    /// Failure surfaced by the backing store, propagated unchanged
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    /// Wrap a backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SessionError::Backend(err.into())
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotBound { model } => {
                write!(f, "no session factory bound for model {model}")
            }
            SessionError::Closed => {
                write!(f, "session scope has already been committed or rolled back")
            }
            SessionError::Backend(e) => {
                write!(f, "backend error: {e}")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Ticket for a row registered via [`Session::stage`], redeemable with
/// [`Session::reload`] for the row's refreshed state (including
/// store-generated keys) while the session is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedId(u64);

impl StagedId {
    pub fn new(raw: u64) -> Self {
        StagedId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Persistence primitives consumed by the CRUD layer.
///
/// Implemented by database adapters; this crate only sequences calls to them.
/// All mutations are pending until `commit`; `rollback` discards them.
pub trait Session {
    /// Register a row for insert or update; rows with a null/absent primary
    /// key receive a store-generated one, observable via `reload`.
    fn stage(&mut self, meta: &'static ModelMeta, row: Attributes)
        -> Result<StagedId, SessionError>;

    /// Register the row with the given primary key for deletion.
    fn stage_delete(&mut self, meta: &'static ModelMeta, id: &Value) -> Result<(), SessionError>;

    /// Flush pending registrations to the store without committing.
    fn flush(&mut self) -> Result<(), SessionError>;

    /// Make all pending changes durable.
    fn commit(&mut self) -> Result<(), SessionError>;

    /// Discard all pending changes.
    fn rollback(&mut self) -> Result<(), SessionError>;

    /// Refresh a staged row's state from the store.
    fn reload(
        &mut self,
        meta: &'static ModelMeta,
        staged: StagedId,
    ) -> Result<Attributes, SessionError>;

    /// Query by primary key; absence is a normal result.
    fn get(
        &mut self,
        meta: &'static ModelMeta,
        id: &Value,
    ) -> Result<Option<Attributes>, SessionError>;

    /// Query all rows of the model's table, backing-store order.
    fn all(&mut self, meta: &'static ModelMeta) -> Result<Vec<Attributes>, SessionError>;

    /// Query the first row by backing-store default ordering.
    fn first(&mut self, meta: &'static ModelMeta) -> Result<Option<Attributes>, SessionError>;
}

/// Connection factory: produces fresh sessions on demand.
///
/// Bound once per model type at startup via `SessionAccess::bind`; read on
/// every scope creation, never mutated mid-transaction.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn Session>, SessionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    Open,
    Committed,
    RolledBack,
}

/// A single-use transactional scope over one session.
///
/// Every delegated call is guarded by the scope state: after the terminal
/// `commit` or `rollback`, further use fails with [`SessionError::Closed`].
/// A failed backend commit leaves the scope open so the caller can still
/// roll back, preserving the one-terminal-operation invariant. Dropping an
/// open scope rolls back; the session itself is released when the scope
/// drops, on every exit path.
pub struct ScopedSession {
    session: Box<dyn Session>,
    state: ScopeState,
}

impl std::fmt::Debug for ScopedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSession")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ScopedSession {
    pub fn new(session: Box<dyn Session>) -> Self {
        ScopedSession {
            session,
            state: ScopeState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ScopeState::Open
    }

    fn guard(&self) -> Result<(), SessionError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    pub fn stage(
        &mut self,
        meta: &'static ModelMeta,
        row: Attributes,
    ) -> Result<StagedId, SessionError> {
        self.guard()?;
        self.session.stage(meta, row)
    }

    pub fn stage_delete(
        &mut self,
        meta: &'static ModelMeta,
        id: &Value,
    ) -> Result<(), SessionError> {
        self.guard()?;
        self.session.stage_delete(meta, id)
    }

    pub fn flush(&mut self) -> Result<(), SessionError> {
        self.guard()?;
        self.session.flush()
    }

    pub fn reload(
        &mut self,
        meta: &'static ModelMeta,
        staged: StagedId,
    ) -> Result<Attributes, SessionError> {
        self.guard()?;
        self.session.reload(meta, staged)
    }

    pub fn get(
        &mut self,
        meta: &'static ModelMeta,
        id: &Value,
    ) -> Result<Option<Attributes>, SessionError> {
        self.guard()?;
        self.session.get(meta, id)
    }

    pub fn all(&mut self, meta: &'static ModelMeta) -> Result<Vec<Attributes>, SessionError> {
        self.guard()?;
        self.session.all(meta)
    }

    pub fn first(
        &mut self,
        meta: &'static ModelMeta,
    ) -> Result<Option<Attributes>, SessionError> {
        self.guard()?;
        self.session.first(meta)
    }

    /// Commit the scope. On backend failure the scope stays open so the
    /// caller can roll back.
    pub fn commit(&mut self) -> Result<(), SessionError> {
        self.guard()?;
        self.session.commit()?;
        self.state = ScopeState::Committed;
        log::trace!("scope committed");
        Ok(())
    }

    /// Roll back the scope. The scope is closed even if the backend's
    /// rollback itself fails.
    pub fn rollback(&mut self) -> Result<(), SessionError> {
        self.guard()?;
        let outcome = self.session.rollback();
        self.state = ScopeState::RolledBack;
        log::trace!("scope rolled back");
        outcome
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.is_open() {
            log::debug!("scope dropped while open, rolling back");
            let _ = self.session.rollback();
            self.state = ScopeState::RolledBack;
        }
    }
}
