//! In-memory reference backend.
//!
//! `MemoryBackend` is the `SessionFactory` used by this crate's tests,
//! doctests, and first-run experiments. It is a test double, not a database
//! engine: rows live in process memory, tables keep insertion order, integer
//! primary keys come from a per-table sequence, and lifecycle counters plus
//! one-shot fault injection make commit/rollback discipline observable.
//!
//! Sessions buffer their mutations as pending operations; reads see the
//! committed state overlaid with the session's own pending changes, so
//! uncommitted work is invisible to other sessions until commit.

use crate::model::{Attributes, ModelMeta};
use crate::session::{Session, SessionError, SessionFactory, StagedId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct Table {
    rows: Vec<Attributes>,
    sequence: i64,
}

#[derive(Default)]
struct SharedState {
    tables: HashMap<String, Table>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<SharedState>,
    sessions_opened: AtomicU64,
    sessions_released: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    flushes: AtomicU64,
    fail_next_commit: AtomicBool,
}

/// Shared in-memory store and session factory.
///
/// Clones share the same store, so a test can keep one handle for
/// assertions while the registry holds another.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// This backend as a bindable factory handle.
    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(self.clone())
    }

    /// Arm a one-shot commit failure: the next commit on any session of this
    /// backend fails with a backend error, leaving its pending changes
    /// unapplied.
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Committed rows of a table, insertion order.
    pub fn rows(&self, table: &str) -> Vec<Attributes> {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn sessions_opened(&self) -> u64 {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> u64 {
        self.inner.sessions_released.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u64 {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> u64 {
        self.inner.flushes.load(Ordering::SeqCst)
    }
}

impl SessionFactory for MemoryBackend {
    fn open_session(&self) -> Result<Box<dyn Session>, SessionError> {
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
            pending: Vec::new(),
        }))
    }
}

enum PendingOp {
    Upsert {
        table: &'static str,
        key: &'static str,
        row: Attributes,
    },
    Delete {
        table: &'static str,
        key: &'static str,
        id: Value,
    },
}

/// One unit of work against a [`MemoryBackend`].
pub struct MemorySession {
    inner: Arc<Inner>,
    pending: Vec<PendingOp>,
}

fn upsert(rows: &mut Vec<Attributes>, key: &str, row: Attributes) {
    let id = row.get(key).cloned();
    match rows
        .iter()
        .position(|existing| existing.get(key) == id.as_ref())
    {
        Some(index) => rows[index] = row,
        None => rows.push(row),
    }
}

impl MemorySession {
    fn next_id(&self, table: &str) -> i64 {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let table = state.tables.entry(table.to_string()).or_default();
        table.sequence += 1;
        table.sequence
    }

    /// Committed rows of `table` with this session's pending ops applied.
    fn view(&self, table: &str) -> Vec<Attributes> {
        let mut rows = {
            let state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state
                .tables
                .get(table)
                .map(|t| t.rows.clone())
                .unwrap_or_default()
        };
        for op in &self.pending {
            match op {
                PendingOp::Upsert {
                    table: t,
                    key,
                    row,
                } if *t == table => upsert(&mut rows, key, row.clone()),
                PendingOp::Delete {
                    table: t,
                    key,
                    id,
                } if *t == table => rows.retain(|row| row.get(*key) != Some(id)),
                _ => {}
            }
        }
        rows
    }
}

impl Session for MemorySession {
    fn stage(
        &mut self,
        meta: &'static ModelMeta,
        mut row: Attributes,
    ) -> Result<StagedId, SessionError> {
        let needs_key = row.get(meta.key).map_or(true, Value::is_null);
        if needs_key {
            // Sequence advances even if the scope later rolls back, like a
            // real store's key generator.
            let id = self.next_id(meta.table);
            row.insert(meta.key.to_string(), Value::from(id));
        }
        let staged = StagedId::new(self.pending.len() as u64);
        self.pending.push(PendingOp::Upsert {
            table: meta.table,
            key: meta.key,
            row,
        });
        Ok(staged)
    }

    fn stage_delete(&mut self, meta: &'static ModelMeta, id: &Value) -> Result<(), SessionError> {
        self.pending.push(PendingOp::Delete {
            table: meta.table,
            key: meta.key,
            id: id.clone(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        // Keys are assigned at stage time; flushing only marks the batch.
        self.inner.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(SessionError::backend("injected commit failure"));
        }
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for op in self.pending.drain(..) {
            match op {
                PendingOp::Upsert { table, key, row } => {
                    let table = state.tables.entry(table.to_string()).or_default();
                    upsert(&mut table.rows, key, row);
                }
                PendingOp::Delete { table, key, id } => {
                    if let Some(table) = state.tables.get_mut(table) {
                        table.rows.retain(|row| row.get(key) != Some(&id));
                    }
                }
            }
        }
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SessionError> {
        self.pending.clear();
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reload(
        &mut self,
        _meta: &'static ModelMeta,
        staged: StagedId,
    ) -> Result<Attributes, SessionError> {
        match self.pending.get(staged.raw() as usize) {
            Some(PendingOp::Upsert { row, .. }) => Ok(row.clone()),
            _ => Err(SessionError::backend("no staged row for ticket")),
        }
    }

    fn get(
        &mut self,
        meta: &'static ModelMeta,
        id: &Value,
    ) -> Result<Option<Attributes>, SessionError> {
        Ok(self
            .view(meta.table)
            .into_iter()
            .find(|row| row.get(meta.key) == Some(id)))
    }

    fn all(&mut self, meta: &'static ModelMeta) -> Result<Vec<Attributes>, SessionError> {
        Ok(self.view(meta.table))
    }

    fn first(&mut self, meta: &'static ModelMeta) -> Result<Option<Attributes>, SessionError> {
        Ok(self.view(meta.table).into_iter().next())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.inner.sessions_released.fetch_add(1, Ordering::SeqCst);
    }
}
