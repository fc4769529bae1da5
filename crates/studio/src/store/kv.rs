// String key-value persistence service.
//
// The session never talks to SQLite directly: it gets an injected
// `KeyValueStore`, which lets tests swap in `MemoryStore` and count reads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::meta_db::FolioDb;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local store. Counts `get` calls per key so tests can assert how
/// often durable storage was read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    reads: Mutex<HashMap<String, usize>>,
    total_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        {
            let mut values = store.values.lock().unwrap_or_else(|e| e.into_inner());
            values.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        store
    }

    pub fn reads_of(&self, key: &str) -> usize {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).get(key).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.total_reads.load(Ordering::Relaxed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        *self
            .reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_default() += 1;
        Ok(self.values.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// `folio.db`-backed store. `rusqlite::Connection` is not `Sync`, so access
/// is serialized through a mutex.
#[derive(Debug)]
pub struct SqliteStore {
    db: Mutex<FolioDb>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { db: Mutex::new(FolioDb::open(path)?) })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { db: Mutex::new(FolioDb::open_in_memory()?) })
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.with_db(|db| db.keys_with_prefix(prefix))
    }

    fn with_db<T>(&self, f: impl FnOnce(&FolioDb) -> Result<T>) -> Result<T> {
        let db = self.db.lock().map_err(|_| anyhow!("folio.db lock poisoned"))?;
        f(&db)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_db(|db| db.get_value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| db.set_value(key, value))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_db(|db| db.delete_value(key).map(|_| ()))
    }
}
