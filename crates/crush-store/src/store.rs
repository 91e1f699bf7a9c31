use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, StoreError};
use crate::schema;

/// Durable string key/value storage.
///
/// Implementations are shared across tasks, so every method takes `&self`
/// and each call is atomic on its own.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// SQLite-backed storage. The connection sits behind a mutex because
/// `rusqlite::Connection` is not `Sync`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    pub fn schema_version(&self) -> Result<Option<i64>> {
        let conn = self.conn()?;
        schema::get_schema_version(&conn)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM storage ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(keys)
    }
}

impl LocalStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM storage WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Process-local storage for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.items.lock().map_err(|_| StoreError::Lock)
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &dyn LocalStorage) {
        assert!(storage.get_item("foo").unwrap().is_none());

        storage.set_item("foo", "bar").unwrap();
        assert_eq!(storage.get_item("foo").unwrap(), Some("bar".to_string()));

        storage.set_item("foo", "baz").unwrap();
        assert_eq!(storage.get_item("foo").unwrap(), Some("baz".to_string()));

        storage.remove_item("foo").unwrap();
        assert!(storage.get_item("foo").unwrap().is_none());

        // Removing a missing key is not an error
        storage.remove_item("foo").unwrap();
    }

    #[test]
    fn test_sqlite_item_lifecycle() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        exercise(&storage);
    }

    #[test]
    fn test_memory_item_lifecycle() {
        let storage = MemoryStorage::new();
        exercise(&storage);
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crush.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.set_item("authToken", "abc").unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("authToken").unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_sqlite_keys_sorted() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.set_item("chatHistory", "[]").unwrap();
        storage.set_item("authToken", "t").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["authToken", "chatHistory"]);
        assert_eq!(
            storage.schema_version().unwrap(),
            Some(schema::SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_sqlite_shared_across_threads() {
        let storage = std::sync::Arc::new(SqliteStorage::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    storage.set_item(&format!("k{i}"), "v").unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(storage.keys().unwrap().len(), 4);
    }
}
