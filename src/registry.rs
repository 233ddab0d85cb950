//! Process-wide session factory registry, keyed by model type.
//!
//! `bind` is expected to run once per model type at startup; rebinding
//! replaces the factory for subsequent operations. Rebinding while scopes
//! are in flight is undefined behavior and the caller's responsibility.

use crate::model::Model;
use crate::session::{SessionError, SessionFactory};
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

static FACTORIES: Lazy<RwLock<HashMap<TypeId, Arc<dyn SessionFactory>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub(crate) fn bind<M: Model>(factory: Arc<dyn SessionFactory>) {
    let replaced = FACTORIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(TypeId::of::<M>(), factory)
        .is_some();
    if replaced {
        log::info!("replaced session factory for {}", M::meta().model);
    } else {
        log::info!("bound session factory for {}", M::meta().model);
    }
}

pub(crate) fn factory_for<M: Model>() -> Result<Arc<dyn SessionFactory>, SessionError> {
    FACTORIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&TypeId::of::<M>())
        .cloned()
        .ok_or(SessionError::NotBound {
            model: M::meta().model,
        })
}
