//! Persistent name -> rating cache
//!
//! Memoizes every lookup outcome across runs, including negative ones: a
//! name mapped to `None` was searched and yielded nothing, and is never
//! queried again until the cache file is deleted. The on-disk format is a
//! JSON object mapping product names to either a rating object or `null`.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::product::MatchResult;

/// Cached outcome of one lookup: a rating, or the explicit negative marker
pub type CachedLookup = Option<MatchResult>;

/// In-memory rating cache backed by a JSON file.
///
/// Concurrent lookups share one instance; the map is guarded by a mutex so
/// interleaved read-check-then-write sequences cannot lose updates.
pub struct RatingCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, CachedLookup>>,
}

impl RatingCache {
    /// Load the cache from disk, best-effort.
    ///
    /// A missing or corrupt file yields an empty cache; both are logged and
    /// neither is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<HashMap<String, CachedLookup>>(&contents) {
                Ok(entries) => {
                    let hits = entries.values().filter(|v| v.is_some()).count();
                    let misses = entries.len() - hits;
                    info!("[CACHE] loaded {} hits (+{} misses)", hits, misses);
                    entries
                }
                Err(e) => {
                    warn!("[CACHE] load failed: {}", e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Cached outcome for a name, if it was ever looked up.
    ///
    /// `Some(None)` is the negative marker, distinct from `None` ("never
    /// looked up").
    pub async fn get(&self, name: &str) -> Option<CachedLookup> {
        self.entries.lock().await.get(name).cloned()
    }

    /// Record a lookup outcome (positive or negative)
    pub async fn insert(&self, name: &str, outcome: CachedLookup) {
        self.entries.lock().await.insert(name.to_string(), outcome);
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Write the cache back to disk, best-effort.
    ///
    /// A failed save is logged and otherwise ignored; the output files have
    /// already been written by the time this runs.
    pub async fn save(&self) {
        let entries = self.entries.lock().await;
        let serialized = match serde_json::to_string_pretty(&*entries) {
            Ok(json) => json,
            Err(e) => {
                warn!("[CACHE] save failed: {}", e);
                return;
            }
        };
        match tokio::fs::write(&self.path, serialized).await {
            Ok(()) => info!(
                "[CACHE] saved {} entries -> {}",
                entries.len(),
                self.path.display()
            ),
            Err(e) => warn!("[CACHE] save failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rating() -> MatchResult {
        MatchResult {
            vivino_url: "https://www.vivino.com/wines/111".to_string(),
            vivino_rating: 4.3,
        }
    }

    #[tokio::test]
    async fn missing_file_yields_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RatingCache::load(dir.path().join("missing.json")).await;
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.get("anything").await, None);
    }

    #[tokio::test]
    async fn corrupt_file_yields_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "{not valid json").await.unwrap();

        let cache = RatingCache::load(&path).await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn round_trip_preserves_positive_and_negative_typing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = RatingCache::load(&path).await;
        cache.insert("hit wine", Some(sample_rating())).await;
        cache.insert("miss wine", None).await;
        cache.save().await;

        let reloaded = RatingCache::load(&path).await;
        assert_eq!(reloaded.len().await, 2);
        assert_eq!(reloaded.get("hit wine").await, Some(Some(sample_rating())));
        // negative marker survives as an explicit null, not an absence
        assert_eq!(reloaded.get("miss wine").await, Some(None));
        assert_eq!(reloaded.get("new wine").await, None);
    }

    #[tokio::test]
    async fn negative_marker_serializes_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = RatingCache::load(&path).await;
        cache.insert("miss wine", None).await;
        cache.save().await;

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["miss wine"].is_null());
    }
}
