use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Flat key → JSON document storage.
///
/// `write` replaces the whole document; there is no partial update. Readers
/// see either the previous document or the new one.
pub trait DocumentStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Value>>;
    fn write(&self, key: &str, doc: &Value) -> Result<()>;
}

/// Read and decode a typed document. `Ok(None)` when the key was never written.
pub fn read_doc<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Result<Option<T>> {
    match store.read(key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn write_doc<T: Serialize>(store: &dyn DocumentStore, key: &str, doc: &T) -> Result<()> {
    let value = serde_json::to_value(doc)?;
    store.write(key, &value)
}

/// [`DocumentStore`] backed by the `documents` table.
pub struct SqliteDocumentStore {
    db: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        let db = self.conn();
        let body: Option<String> = db
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, doc: &Value) -> Result<()> {
        let body = serde_json::to_string(doc)?;
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.conn();
        db.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body,
                                            updated_at = excluded.updated_at",
            rusqlite::params![key, body, now],
        )?;
        debug!(%key, bytes = body.len(), "document written");
        Ok(())
    }
}
