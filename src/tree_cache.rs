// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Folder-tree cache.
//!
//! A single persisted slot memoizing one folder's immediate subfolder list,
//! so expanding the tree for a large directory doesn't rescan it on every
//! visit within a session. The slot is a JSON file
//! `{"timestamp": <epoch-ms>, "data": {"path": ..., "folders": [...]}}`.
//!
//! A read hits only when the stored path matches exactly and the entry is
//! younger than the TTL; a mismatch, a stale timestamp, a missing file, or
//! unparseable JSON all read as absent, never as an error. Writing
//! unconditionally overwrites the slot, so opening a different root
//! invalidates the cache for every other root.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub const CACHE_FILE_NAME: &str = "file_tree_cache.json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    timestamp: u64,
    data: CachedTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedTree {
    path: String,
    folders: Vec<String>,
}

pub struct TreeCache {
    file: PathBuf,
    ttl: Duration,
}

impl TreeCache {
    /// Cache slot in the platform cache directory.
    pub fn new(ttl: Duration) -> Self {
        let file = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("sig")
            .join(CACHE_FILE_NAME);
        Self::with_file(file, ttl)
    }

    /// Cache slot at an explicit location.
    pub fn with_file(file: PathBuf, ttl: Duration) -> Self {
        Self { file, ttl }
    }

    /// The cached subfolder list for `path`, if the slot holds a fresh
    /// entry for exactly that path.
    pub fn read(&self, path: &Path) -> Option<Vec<String>> {
        let content = std::fs::read_to_string(&self.file).ok()?;
        let cache: CacheFile = serde_json::from_str(&content).ok()?;
        if cache.data.path != path.to_string_lossy() {
            return None;
        }
        let age = epoch_ms().saturating_sub(cache.timestamp);
        if age >= self.ttl.as_millis() as u64 {
            return None;
        }
        Some(cache.data.folders)
    }

    /// Overwrite the slot with `folders` for `path`.
    pub fn write(&self, path: &Path, folders: &[String]) -> std::io::Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = CacheFile {
            timestamp: epoch_ms(),
            data: CachedTree {
                path: path.to_string_lossy().into_owned(),
                folders: folders.to_vec(),
            },
        };
        let json = serde_json::to_string(&cache).map_err(std::io::Error::other)?;
        std::fs::write(&self.file, json)
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
