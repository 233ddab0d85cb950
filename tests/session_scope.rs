//! Session lifecycle discipline: binding, scope state machine, commit and
//! rollback accounting, and query handle behavior.

mod common;

use common::{bind_fresh_backend, lock, User};
use registrar::{
    attrs, ActiveRecord, AttributeError, MemoryBackend, Model, ModelMeta, SessionAccess,
    SessionError,
};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
struct NeverBound {
    id: Option<i64>,
}

static NEVER_BOUND_META: ModelMeta = ModelMeta {
    model: "NeverBound",
    table: "never_bound",
    key: "id",
};

impl Model for NeverBound {
    fn meta() -> &'static ModelMeta {
        &NEVER_BOUND_META
    }

    fn columns() -> &'static [&'static str] {
        &["id"]
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.map_or(Value::Null, Value::from)),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "id" => {
                self.id = registrar::value::coerce(name, &value)?;
                Ok(())
            }
            _ => Err(AttributeError::Unknown {
                attribute: name.to_string(),
            }),
        }
    }
}

fn staged_user(name: &str) -> registrar::Attributes {
    attrs! {
        "first_name" => (name),
        "last_name" => "",
        "email" => null,
        "active" => false,
    }
}

#[test]
fn test_operations_on_unbound_model_fail() {
    let _guard = lock();
    let err = NeverBound::scoped_session().unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotBound {
            model: "NeverBound"
        }
    ));

    let err = NeverBound::all().unwrap_err();
    assert!(err.to_string().contains("NeverBound"));
}

#[test]
fn test_rebind_replaces_factory_for_subsequent_operations() {
    let _guard = lock();
    let first = bind_fresh_backend();
    User::create(attrs! { "first_name" => "on-first" }).unwrap();

    let second = MemoryBackend::new();
    User::bind(second.factory());
    User::create(attrs! { "first_name" => "on-second" }).unwrap();

    assert_eq!(first.rows("users").len(), 1);
    assert_eq!(second.rows("users").len(), 1);
    assert_eq!(
        second.rows("users")[0]["first_name"],
        serde_json::json!("on-second")
    );
}

#[test]
fn test_transaction_commits_on_success() {
    let _guard = lock();
    let backend = bind_fresh_backend();

    User::transaction(|scope| {
        scope.stage(User::meta(), staged_user("ada"))?;
        Ok::<(), SessionError>(())
    })
    .unwrap();

    assert_eq!(backend.rows("users").len(), 1);
    assert_eq!(backend.commits(), 1);
    assert_eq!(backend.rollbacks(), 0);
}

#[test]
fn test_transaction_rolls_back_and_propagates_body_error() {
    let _guard = lock();
    let backend = bind_fresh_backend();

    let err = User::transaction(|scope| {
        scope.stage(User::meta(), staged_user("ghost"))?;
        Err::<(), SessionError>(SessionError::backend("application failure"))
    })
    .unwrap_err();

    assert!(err.to_string().contains("application failure"));
    assert!(backend.rows("users").is_empty());
    assert_eq!(backend.commits(), 0);
    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.sessions_opened(), backend.sessions_released());
}

#[test]
fn test_transaction_commit_failure_rolls_back() {
    let _guard = lock();
    let backend = bind_fresh_backend();
    backend.fail_next_commit();

    let err = User::transaction(|scope| {
        scope.stage(User::meta(), staged_user("ghost"))?;
        Ok::<(), SessionError>(())
    })
    .unwrap_err();

    assert!(matches!(err, SessionError::Backend(_)));
    assert!(backend.rows("users").is_empty());
    assert_eq!(backend.commits(), 0);
    assert_eq!(backend.rollbacks(), 1);
}

#[test]
fn test_scope_is_single_use_after_commit() {
    let _guard = lock();
    bind_fresh_backend();

    let mut scope = User::scoped_session().unwrap();
    scope.stage(User::meta(), staged_user("ada")).unwrap();
    scope.commit().unwrap();

    assert!(matches!(
        scope.stage(User::meta(), staged_user("again")),
        Err(SessionError::Closed)
    ));
    assert!(matches!(scope.commit(), Err(SessionError::Closed)));
    assert!(matches!(scope.rollback(), Err(SessionError::Closed)));
}

#[test]
fn test_open_scope_dropped_without_terminal_rolls_back() {
    let _guard = lock();
    let backend = bind_fresh_backend();

    {
        let mut scope = User::scoped_session().unwrap();
        scope.stage(User::meta(), staged_user("ghost")).unwrap();
        // dropped without commit or rollback
    }

    assert!(backend.rows("users").is_empty());
    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.sessions_released(), 1);
}

#[test]
fn test_failed_commit_leaves_scope_open_for_explicit_rollback() {
    let _guard = lock();
    let backend = bind_fresh_backend();
    backend.fail_next_commit();

    let mut scope = User::scoped_session().unwrap();
    scope.stage(User::meta(), staged_user("ghost")).unwrap();
    assert!(matches!(scope.commit(), Err(SessionError::Backend(_))));
    assert!(scope.is_open());
    scope.rollback().unwrap();

    assert_eq!(backend.commits(), 0);
    assert_eq!(backend.rollbacks(), 1);
}

#[test]
fn test_uncommitted_changes_invisible_to_other_sessions() {
    let _guard = lock();
    bind_fresh_backend();

    let mut scope = User::scoped_session().unwrap();
    scope.stage(User::meta(), staged_user("pending")).unwrap();

    // A concurrently opened session sees nothing yet
    assert!(User::all().unwrap().is_empty());

    scope.commit().unwrap();
    assert_eq!(User::all().unwrap().len(), 1);
}

#[test]
fn test_query_handle_is_eager_and_survives_across_calls() {
    let _guard = lock();
    let backend = bind_fresh_backend();

    let query = User::query().unwrap();
    assert!(query.all().unwrap().is_empty());

    // The handle observes writes made after it was built
    let user = User::create(attrs! { "first_name" => "ada" }).unwrap();
    assert_eq!(query.all().unwrap().len(), 1);
    assert_eq!(
        query.get(user.id.unwrap()).unwrap().unwrap().first_name,
        "ada"
    );

    // An intervening failed transaction does not poison the handle
    backend.fail_next_commit();
    assert!(User::create(attrs! { "first_name" => "ghost" }).is_err());
    assert_eq!(query.all().unwrap().len(), 1);
    assert_eq!(query.first().unwrap().unwrap().first_name, "ada");
}

#[test]
fn test_exactly_one_terminal_operation_per_scope() {
    let _guard = lock();
    let backend = bind_fresh_backend();

    // Mixed workload: saves, reads, a failed save, an explicit transaction,
    // and an abandoned scope.
    let user = User::create(attrs! { "first_name" => "a" }).unwrap();
    User::create(attrs! { "first_name" => "b" }).unwrap();
    let _ = User::all().unwrap();
    let _ = User::find(user.id.unwrap()).unwrap();

    backend.fail_next_commit();
    assert!(User::create(attrs! { "first_name" => "ghost" }).is_err());

    User::transaction(|scope| {
        scope.stage_delete(User::meta(), &serde_json::json!(1))?;
        Ok::<(), SessionError>(())
    })
    .unwrap();

    {
        let _scope = User::scoped_session().unwrap();
    }

    assert_eq!(backend.sessions_opened(), backend.sessions_released());
    assert_eq!(
        backend.commits() + backend.rollbacks(),
        backend.sessions_released()
    );
}
