//! Versioned per-session dataset cache.
//!
//! Entries live under `gmv_dashboard_data_<sessionId>` as JSON text. An entry whose
//! `version` differs from [`CACHE_VERSION`] is a miss: it is never partially trusted.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use super::error::{Result, SyncError};
use super::lock;
use crate::models::{AllDataResponse, LiveStats, ProductRow};

/// Bump whenever the entry layout changes.
pub const CACHE_VERSION: u32 = 4;

pub const CACHE_KEY_PREFIX: &str = "gmv_dashboard_data_";

pub fn cache_key(session_id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{session_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub version: u32,
    pub data: Vec<ProductRow>,
    #[serde(default)]
    pub shop_ids: Vec<String>,
    #[serde(default)]
    pub stats: LiveStats,
    #[serde(default)]
    pub last_sync: Option<String>,
    /// Milliseconds since the epoch when the entry was written.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn from_response(response: &AllDataResponse) -> Self {
        Self {
            version: CACHE_VERSION,
            data: response.data.clone(),
            shop_ids: response.shop_ids.clone(),
            stats: response.stats,
            last_sync: response.last_sync.clone(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

/// String key-value storage, the shape of browser local storage.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str);
}

/// Reads a session's entry. Missing, unparseable and stale-version entries all read as `None`.
pub async fn read_cached(store: &dyn CacheStore, session_id: &str) -> Option<CacheEntry> {
    let raw = store.get(&cache_key(session_id)).await?;

    let probe: VersionProbe = serde_json::from_str(&raw).ok()?;
    if probe.version != Some(CACHE_VERSION) {
        debug!(session_id, version = ?probe.version, "ignoring stale cache entry");
        return None;
    }

    match serde_json::from_str(&raw) {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(session_id, "discarding unreadable cache entry: {err}");
            None
        }
    }
}

pub async fn write_cached(
    store: &dyn CacheStore,
    session_id: &str,
    entry: &CacheEntry,
) -> Result<()> {
    let payload = serde_json::to_string(entry)?;
    store.set(&cache_key(session_id), payload).await
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) {
        lock(&self.entries).remove(key);
    }
}

/// Store backed by one JSON object on disk, rewritten on every change.
///
/// The map lock is held across each rewrite so writes land on disk in order.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: AsyncMutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens `path`, starting empty if it is missing or unreadable.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!("failed to parse cache file {}: {err}", path.display());
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!("failed to read cache file {}: {err}", path.display());
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: AsyncMutex::new(entries),
        }
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let payload = serde_json::to_vec_pretty(entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).await.map_err(storage_error)?;
        fs::rename(&tmp, &self.path).await.map_err(storage_error)
    }
}

fn storage_error(err: std::io::Error) -> SyncError {
    SyncError::Storage(err.to_string())
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            if let Err(err) = self.flush(&entries).await {
                warn!("failed to persist cache removal: {err}");
            }
        }
    }
}
