//! Shared test entities and fixtures.
//!
//! Hand-implemented `Model` types exercising the full settable-attribute
//! surface: plain columns, a hybrid property backed by two columns, and a
//! settable relation. Tests rebind the process-wide registry, so suites that
//! bind take the [`lock`] guard to serialize against each other.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use registrar::{value, AttributeError, MemoryBackend, Model, ModelMeta, SessionAccess};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

static GUARD: Mutex<()> = Mutex::new(());

/// Serialize tests that touch the factory registry.
pub fn lock() -> MutexGuard<'static, ()> {
    GUARD.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bind a fresh in-memory backend for `User` and `Post`.
pub fn bind_fresh_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    User::bind(backend.factory());
    Post::bind(backend.factory());
    backend
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub active: bool,
}

static USER_META: ModelMeta = ModelMeta {
    model: "User",
    table: "users",
    key: "id",
};

impl Model for User {
    fn meta() -> &'static ModelMeta {
        &USER_META
    }

    fn columns() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "email", "active"]
    }

    fn hybrid_properties() -> &'static [&'static str] {
        &["full_name"]
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.map_or(Value::Null, Value::from)),
            "first_name" => Some(Value::from(self.first_name.clone())),
            "last_name" => Some(Value::from(self.last_name.clone())),
            "email" => Some(self.email.clone().map_or(Value::Null, Value::from)),
            "active" => Some(Value::from(self.active)),
            "full_name" => Some(Value::from(format!(
                "{} {}",
                self.first_name, self.last_name
            ))),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "id" => self.id = value::coerce(name, &value)?,
            "first_name" => self.first_name = value::coerce(name, &value)?,
            "last_name" => self.last_name = value::coerce(name, &value)?,
            "email" => self.email = value::coerce(name, &value)?,
            "active" => self.active = value::coerce(name, &value)?,
            "full_name" => {
                let full: String = value::coerce(name, &value)?;
                match full.split_once(' ') {
                    Some((first, last)) => {
                        self.first_name = first.to_string();
                        self.last_name = last.to_string();
                    }
                    None => {
                        self.first_name = full;
                        self.last_name.clear();
                    }
                }
            }
            _ => {
                return Err(AttributeError::Unknown {
                    attribute: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub author_id: Option<i64>,
    pub token: Option<Uuid>,
    pub published_at: Option<DateTime<Utc>>,
}

static POST_META: ModelMeta = ModelMeta {
    model: "Post",
    table: "posts",
    key: "id",
};

impl Model for Post {
    fn meta() -> &'static ModelMeta {
        &POST_META
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "author_id", "token", "published_at"]
    }

    fn settable_relations() -> &'static [&'static str] {
        &["author"]
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.map_or(Value::Null, Value::from)),
            "title" => Some(Value::from(self.title.clone())),
            "author_id" => Some(self.author_id.map_or(Value::Null, Value::from)),
            "token" => Some(
                self.token
                    .map_or(Value::Null, |token| Value::from(token.to_string())),
            ),
            "published_at" => Some(
                self.published_at
                    .map_or(Value::Null, |at| Value::from(at.to_rfc3339())),
            ),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "id" => self.id = value::coerce(name, &value)?,
            "title" => self.title = value::coerce(name, &value)?,
            "author_id" => self.author_id = value::coerce(name, &value)?,
            // Assigning the relation sets the foreign key; accepts an id or null
            "author" => self.author_id = value::coerce(name, &value)?,
            "token" => {
                let raw: Option<String> = value::coerce(name, &value)?;
                self.token = match raw {
                    Some(raw) => {
                        Some(Uuid::parse_str(&raw).map_err(|_| AttributeError::TypeMismatch {
                            attribute: name.to_string(),
                            expected: "UUID string",
                            actual: format!("\"{raw}\""),
                        })?)
                    }
                    None => None,
                };
            }
            "published_at" => {
                let raw: Option<String> = value::coerce(name, &value)?;
                self.published_at = match raw {
                    Some(raw) => Some(
                        DateTime::parse_from_rfc3339(&raw)
                            .map(|at| at.with_timezone(&Utc))
                            .map_err(|_| AttributeError::TypeMismatch {
                                attribute: name.to_string(),
                                expected: "RFC 3339 timestamp",
                                actual: format!("\"{raw}\""),
                            })?,
                    ),
                    None => None,
                };
            }
            _ => {
                return Err(AttributeError::Unknown {
                    attribute: name.to_string(),
                })
            }
        }
        Ok(())
    }
}
