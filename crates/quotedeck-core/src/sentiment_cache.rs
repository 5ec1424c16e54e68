//! Key-value persistence for sentiment indices.
//!
//! Persistence is best-effort: a failed write or a corrupt stored payload
//! never blocks a refresh, it only costs the warm start.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::{SentimentDomain, SentimentIndex};

/// Synchronous string key-value store.
///
/// `save` is best-effort; implementations report failures through logging
/// rather than the return type, mirroring browser local-storage semantics.
pub trait KvStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;

    fn save(&self, key: &str, value: &str);
}

/// In-memory store used by tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KvStore for MemoryKvStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("kv entries not poisoned")
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("kv entries not poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

/// File-backed store holding all keys in a single JSON map.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileKvStore {
    /// Opens the store, loading whatever the file currently holds.
    /// A missing or unreadable file starts the store empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) {
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(error) = std::fs::write(&self.path, raw) {
                    tracing::warn!(path = %self.path.display(), "kv store write failed: {error}");
                }
            }
            Err(error) => {
                tracing::warn!("kv store serialization failed: {error}");
            }
        }
    }
}

impl KvStore for FileKvStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("kv entries not poisoned")
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().expect("kv entries not poisoned");
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries);
    }
}

/// Persists the latest sentiment index per domain across restarts.
pub struct SentimentCache {
    store: Box<dyn KvStore>,
}

impl SentimentCache {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(domain: SentimentDomain) -> String {
        format!("sentiment.{}", domain.as_str())
    }

    /// Returns the cached index for a domain, or `None` when absent or
    /// the stored payload no longer decodes.
    pub fn load(&self, domain: SentimentDomain) -> Option<SentimentIndex> {
        let raw = self.store.load(&Self::key(domain))?;
        match serde_json::from_str::<SentimentIndex>(&raw) {
            Ok(index) => Some(index),
            Err(error) => {
                tracing::debug!(
                    domain = domain.as_str(),
                    "discarding corrupt cached sentiment: {error}"
                );
                None
            }
        }
    }

    pub fn save(&self, index: &SentimentIndex) {
        match serde_json::to_string(index) {
            Ok(raw) => self.store.save(&Self::key(index.domain), &raw),
            Err(error) => {
                tracing::warn!(
                    domain = index.domain.as_str(),
                    "sentiment serialization failed: {error}"
                );
            }
        }
    }
}
