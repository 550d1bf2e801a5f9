//! Key-value persistence shared by the cache, wallet registry and sync identity.
//!
//! The durable store is a single SQLite table in WAL mode. Values are opaque
//! strings (JSON in practice); each named store above this layer owns its
//! own key prefix.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};

use kinko_common::error::{KinkoError, KinkoResult};

/// Synchronous string key-value store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> KinkoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KinkoResult<()>;
    fn remove(&self, key: &str) -> KinkoResult<()>;
    /// All keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> KinkoResult<Vec<String>>;
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLITE
// ═══════════════════════════════════════════════════════════════════════

/// Durable store at `~/.kinko/data/kinko.db`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the default database under the workspace dotfolder.
    pub fn open_default() -> anyhow::Result<Self> {
        let db_path = crate::workspace::root_dir()?.join("data/kinko.db");
        Self::open(&db_path)
    }

    /// Open (or create) a database file. Enables WAL and creates the table.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self { conn: Mutex::new(conn) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_ms INTEGER NOT NULL
            );
            ",
        )
        .context("Failed to initialize database tables")?;
        Ok(())
    }

    fn lock(&self) -> KinkoResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KinkoError::Storage("database mutex poisoned".into()))
    }
}

fn storage_err(e: rusqlite::Error) -> KinkoError {
    KinkoError::Storage(e.to_string())
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> KinkoResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(storage_err)
    }

    fn set(&self, key: &str, value: &str) -> KinkoResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_ms = excluded.updated_ms",
            params![key, value, now],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KinkoResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key]).map_err(storage_err)?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> KinkoResult<Vec<String>> {
        let conn = self.lock()?;
        // substr instead of LIKE so `_` and `%` in keys match literally.
        let mut stmt = conn
            .prepare("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
            .map_err(storage_err)?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))
            .map_err(storage_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)?;
        Ok(keys)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  MEMORY
// ═══════════════════════════════════════════════════════════════════════

/// Process-local store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KinkoResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.map
            .lock()
            .map_err(|_| KinkoError::Storage("memory store mutex poisoned".into()))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> KinkoResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KinkoResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KinkoResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> KinkoResult<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        assert!(store.get("a").unwrap().is_none());

        store.set("a", "1").unwrap();
        store.set("kinko.cache:x", "2").unwrap();
        store.set("kinko.cache:y", "3").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        // Overwrite
        store.set("a", "10").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("10"));

        let keys = store.keys_with_prefix("kinko.cache:").unwrap();
        assert_eq!(keys, vec!["kinko.cache:x", "kinko.cache:y"]);

        store.remove("kinko.cache:x").unwrap();
        assert_eq!(store.keys_with_prefix("kinko.cache:").unwrap(), vec!["kinko.cache:y"]);
        // Removing a missing key is not an error
        store.remove("missing").unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        exercise(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_prefix_is_literal() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("a_b:1", "x").unwrap();
        store.set("axb:1", "y").unwrap();
        assert_eq!(store.keys_with_prefix("a_b:").unwrap(), vec!["a_b:1"]);
    }
}
