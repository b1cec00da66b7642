//! Disk-persisted model-list cache with TTL.
//!
//! The in-memory map is the source of truth for a session; the JSON file
//! exists so a fresh start can show model pickers without a network call.
//! Persistence failures are logged and swallowed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Default cache validity window: 14 days.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1_209_600);

const CACHE_FILE_NAME: &str = "models_cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    models: Vec<String>,
    timestamp: f64,
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub struct ModelCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    cache_file: PathBuf,
    ttl: Duration,
}

impl ModelCache {
    pub fn new(config_dir: &Path, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cache_file: config_dir.join(CACHE_FILE_NAME),
            ttl,
        }
    }

    pub fn with_default_ttl(config_dir: &Path) -> Self {
        Self::new(config_dir, DEFAULT_CACHE_TTL)
    }

    /// Cached (models, timestamp) for a provider, only while younger than
    /// the TTL. A stale entry behaves as a miss but stays in memory until
    /// overwritten.
    pub fn get(&self, provider_key: &str) -> Option<(Vec<String>, f64)> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(provider_key)?;
        if now_secs() - entry.timestamp < self.ttl.as_secs_f64() {
            Some((entry.models.clone(), entry.timestamp))
        } else {
            None
        }
    }

    /// Update the in-memory map only.
    pub fn set(&self, provider_key: &str, models: Vec<String>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            provider_key.to_string(),
            CacheEntry {
                models,
                timestamp: now_secs(),
            },
        );
    }

    /// Update the map and immediately persist the whole cache to disk.
    pub fn cache_models_and_persist(&self, provider_key: &str, models: Vec<String>) {
        self.set(provider_key, models);
        self.save_to_disk();
    }

    /// Load the persisted cache into memory, if a file exists.
    pub fn load_from_disk(&self) {
        if !self.cache_file.exists() {
            return;
        }
        let raw = match fs::read_to_string(&self.cache_file) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("failed to read model cache file: {e}");
                return;
            }
        };
        match serde_json::from_str::<HashMap<String, CacheEntry>>(&raw) {
            Ok(loaded) => {
                let mut entries = self.entries.lock().expect("cache lock poisoned");
                entries.extend(loaded);
                info!("loaded model cache from disk");
            }
            Err(e) => warn!("failed to parse model cache file: {e}"),
        }
    }

    /// Persist the in-memory map. The snapshot is taken under the lock; the
    /// write happens outside it.
    pub fn save_to_disk(&self) {
        let snapshot = {
            let entries = self.entries.lock().expect("cache lock poisoned");
            entries.clone()
        };
        match serde_json::to_vec_pretty(&snapshot) {
            Ok(data) => {
                if let Err(e) = fs::write(&self.cache_file, data) {
                    warn!("failed to save model cache to disk: {e}");
                } else {
                    debug!("saved model cache to disk");
                }
            }
            Err(e) => warn!("failed to serialize model cache: {e}"),
        }
    }

    /// Delete the cache file entirely once its mtime exceeds the TTL.
    /// Coarse-grained on purpose: the file is one unit of staleness.
    pub fn cleanup_old_files(&self) {
        let age = fs::metadata(&self.cache_file)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok());
        if let Some(age) = age {
            if age > self.ttl {
                if let Err(e) = fs::remove_file(&self.cache_file) {
                    debug!("failed to remove stale model cache file: {e}");
                } else {
                    debug!("removed stale model cache file");
                }
            }
        }
    }

    /// Drop one provider's entry, or everything.
    pub fn clear(&self, provider_key: Option<&str>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match provider_key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    pub fn is_cached(&self, provider_key: &str) -> bool {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .contains_key(provider_key)
    }

    /// Best-effort load + stale-file cleanup for manager finalization.
    pub fn initialize_safely(&self) {
        self.load_from_disk();
        self.cleanup_old_files();
    }

    #[cfg(test)]
    pub(crate) fn set_with_timestamp(&self, provider_key: &str, models: Vec<String>, timestamp: f64) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(provider_key.to_string(), CacheEntry { models, timestamp });
    }
}

/// True when every model id is a non-blank string and the list is non-empty.
pub fn validate_model_list(models: &[String]) -> bool {
    !models.is_empty() && models.iter().all(|m| !m.trim().is_empty())
}
