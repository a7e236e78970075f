//! Persistent key-value store — the home of the defaults record and per-domain records.
//!
//! Two areas exist: `local` (every record) and `sync` (a mirror of the defaults record
//! only). Every successful write publishes a [`StorageChange`] on a shared
//! [`ChangeFeed`], which is how other execution contexts learn about edits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::database::Database;
use crate::types::errors::StorageError;

/// Key of the global defaults record.
pub const DEFAULTS_KEY: &str = "achromatopsia:defaults";
/// Hostname used when a page has none.
pub const GLOBAL_DOMAIN: &str = "global";

const CHANGE_FEED_CAPACITY: usize = 256;

/// Key of the record for a hostname.
pub fn domain_key(hostname: &str) -> String {
    let host = hostname.trim();
    if host.is_empty() {
        format!("achromatopsia:{}", GLOBAL_DOMAIN)
    } else {
        format!("achromatopsia:{}", host)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AreaName {
    Local,
    Sync,
}

impl AreaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaName::Local => "local",
            AreaName::Sync => "sync",
        }
    }
}

/// One record written (or removed) in an area.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    pub area: AreaName,
    pub key: String,
    /// `None` when the record was removed.
    pub new_value: Option<Value>,
}

/// Broadcast channel shared by every store of one installation.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, change: StorageChange) {
        // No receivers is fine.
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Key-value persistence over JSON values.
pub trait StorageArea: Send {
    fn get(&self, area: AreaName, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, area: AreaName, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&self, area: AreaName, key: &str) -> Result<(), StorageError>;
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

// ─── SQLite ───

/// Store backed by the `kv_store` table.
pub struct SqliteStore {
    db: Database,
    feed: ChangeFeed,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P, feed: ChangeFeed) -> Result<Self, StorageError> {
        Ok(Self {
            db: Database::open(path)?,
            feed,
        })
    }

    pub fn open_in_memory(feed: ChangeFeed) -> Result<Self, StorageError> {
        Ok(Self {
            db: Database::open_in_memory()?,
            feed,
        })
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

impl StorageArea for SqliteStore {
    fn get(&self, area: AreaName, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM kv_store WHERE area = ?1 AND key = ?2",
                rusqlite::params![area.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    fn set(&self, area: AreaName, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.db.connection().execute(
            "INSERT INTO kv_store (area, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(area, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![area.as_str(), key, text, Self::now()],
        )?;
        self.feed.publish(StorageChange {
            area,
            key: key.to_string(),
            new_value: Some(value.clone()),
        });
        Ok(())
    }

    fn remove(&self, area: AreaName, key: &str) -> Result<(), StorageError> {
        let removed = self.db.connection().execute(
            "DELETE FROM kv_store WHERE area = ?1 AND key = ?2",
            rusqlite::params![area.as_str(), key],
        )?;
        if removed > 0 {
            self.feed.publish(StorageChange {
                area,
                key: key.to_string(),
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}

// ─── Memory ───

type MemoryMap = HashMap<(AreaName, String), Value>;

/// In-process store. Clones share the same records.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<Mutex<MemoryMap>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            feed,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryMap>, StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl StorageArea for MemoryStore {
    fn get(&self, area: AreaName, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.lock()?.get(&(area, key.to_string())).cloned())
    }

    fn set(&self, area: AreaName, key: &str, value: &Value) -> Result<(), StorageError> {
        self.lock()?.insert((area, key.to_string()), value.clone());
        self.feed.publish(StorageChange {
            area,
            key: key.to_string(),
            new_value: Some(value.clone()),
        });
        Ok(())
    }

    fn remove(&self, area: AreaName, key: &str) -> Result<(), StorageError> {
        if self.lock()?.remove(&(area, key.to_string())).is_some() {
            self.feed.publish(StorageChange {
                area,
                key: key.to_string(),
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}

// ─── Fallback ───

/// Uses the primary store until it fails, then continues in memory only.
pub struct FallbackStore {
    primary: Box<dyn StorageArea>,
    memory: MemoryStore,
    degraded: AtomicBool,
    feed: ChangeFeed,
}

impl FallbackStore {
    pub fn new(primary: Box<dyn StorageArea>, feed: ChangeFeed) -> Self {
        Self {
            primary,
            memory: MemoryStore::new(feed.clone()),
            degraded: AtomicBool::new(false),
            feed,
        }
    }

    /// A store that never had a usable primary.
    pub fn memory_only(feed: ChangeFeed) -> Self {
        let store = Self::new(Box::new(MemoryStore::new(feed.clone())), feed);
        store.degraded.store(true, Ordering::Relaxed);
        store
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn degrade(&self, operation: &str, error: &StorageError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                target: "achroma_reader",
                operation,
                error = %error,
                "persistent store unavailable; using in-memory fallback"
            );
        }
    }
}

impl StorageArea for FallbackStore {
    fn get(&self, area: AreaName, key: &str) -> Result<Option<Value>, StorageError> {
        if self.is_degraded() {
            return self.memory.get(area, key);
        }
        match self.primary.get(area, key) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.degrade("get", &e);
                self.memory.get(area, key)
            }
        }
    }

    fn set(&self, area: AreaName, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.is_degraded() {
            return self.memory.set(area, key, value);
        }
        match self.primary.set(area, key, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.degrade("set", &e);
                self.memory.set(area, key, value)
            }
        }
    }

    fn remove(&self, area: AreaName, key: &str) -> Result<(), StorageError> {
        if self.is_degraded() {
            return self.memory.remove(area, key);
        }
        match self.primary.remove(area, key) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.degrade("remove", &e);
                self.memory.remove(area, key)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}
