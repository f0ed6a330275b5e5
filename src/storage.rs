//! Local key-value persistence.
//!
//! The app-side cache is a flat string-keyed store, namespaced per user and
//! per category (e.g. `@water_intake_{uid}`). Two backends are provided:
//! an in-memory store for tests and guest sessions, and a JSON-file store
//! for durable on-device state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store. Tracks per-key write counts so tests can assert that
/// guest sessions with zero values never touch storage.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls issued against `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.writes
            .lock()
            .map(|w| w.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut writes = self
                .writes
                .lock()
                .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
            *writes.entry(key.to_string()).or_insert(0) += 1;
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Durable store backed by a single JSON document on disk.
///
/// The whole map is rewritten on every mutation; the key space is small
/// (a handful of categories per user) so this stays cheap.
pub struct FileStore {
    path: PathBuf,
    cache: tokio::sync::Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, loading any existing content.
    /// A missing or unreadable file starts empty rather than failing.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            cache: tokio::sync::Mutex::new(cache),
        }
    }

    async fn flush(&self, cache: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(cache)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("writing local store {}", self.path.display()))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.insert(key.to_string(), value.to_string());
        self.flush(&cache).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.remove(key);
        self.flush(&cache).await
    }
}
