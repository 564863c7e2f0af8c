//! Local snapshot cache for instantly-rendered stale views.
//!
//! A string-keyed store of serialized JSON blobs: an in-memory map in
//! front of optional on-disk files. Values are always replaced whole —
//! no expiry, no size bound, no partial updates. Readers get whatever
//! snapshot was last written while the authoritative refresh is in
//! flight.
//!
//! Cache failures are never surfaced: a read miss or a write error
//! degrades to "no cached view", which callers already handle.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct CacheStore {
    mem: Arc<DashMap<String, serde_json::Value>>,
    /// Directory for persisted blobs; `None` keeps the cache memory-only.
    dir: Option<PathBuf>,
}

impl CacheStore {
    /// Cache backed by a directory. The directory is created eagerly so
    /// later write failures are surfaced once, at startup.
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            mem: Arc::new(DashMap::new()),
            dir: Some(dir),
        })
    }

    /// Memory-only cache (tests, or no CACHE_DIR configured).
    pub fn new_memory() -> Self {
        Self {
            mem: Arc::new(DashMap::new()),
            dir: None,
        }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", urlencoding::encode(key))))
    }

    /// Read the cached value for `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(value) = self.mem.get(key) {
            return match serde_json::from_value(value.clone()) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            };
        }

        // Cold start: fall back to the persisted blob.
        let path = self.path_for(key)?;
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                let decoded = serde_json::from_value(value.clone()).ok();
                if decoded.is_some() {
                    self.mem.insert(key.to_string(), value);
                }
                decoded
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding corrupt cache file");
                None
            }
        }
    }

    /// Replace the cached value for `key` wholesale.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Some(path) = self.path_for(key) {
            match serde_json::to_string(&value) {
                Ok(raw) => {
                    if let Err(e) = std::fs::write(&path, raw) {
                        tracing::warn!(key, error = %e, "Failed to persist cache entry");
                    }
                }
                Err(e) => tracing::warn!(key, error = %e, "Failed to encode cache entry"),
            }
        }

        self.mem.insert(key.to_string(), value);
    }

    /// Drop a cached value.
    pub fn remove(&self, key: &str) {
        self.mem.remove(key);
        if let Some(path) = self.path_for(key) {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Cache keys used across the app.
pub mod keys {
    /// Inbound connection requests for one user.
    pub fn connection_requests(user_id: &str) -> String {
        format!("requests:connections:{}", user_id)
    }

    /// The global device-wanted list.
    pub const DEVICE_REQUESTS: &str = "requests:devices";
}
