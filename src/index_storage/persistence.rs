//! Cache persistence: load/save with atomic writes

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use super::metadata::ConversationCache;

/// Default cache file name inside the cache directory
pub const CACHE_FILENAME: &str = "conversation-cache.json";

/// Sole persistence boundary for the conversation cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache, degrading to an empty one when it is missing or unreadable
    ///
    /// Corruption is logged and never returned as an error; the next scan rebuilds.
    pub fn load(&self) -> ConversationCache {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ConversationCache::empty();
            }
            Err(e) => {
                warn!(cache = %self.path.display(), error = %e, "failed to read cache, starting fresh");
                return ConversationCache::empty();
            }
        };

        match serde_json::from_str::<ConversationCache>(&contents) {
            Ok(mut cache) => {
                if !cache.is_consistent() {
                    warn!(cache = %self.path.display(), "cache id set out of sync, repairing");
                    cache.sync_known_ids();
                }
                cache
            }
            Err(e) => {
                warn!(cache = %self.path.display(), error = %e, "cache is corrupted, starting fresh");
                ConversationCache::empty()
            }
        }
    }

    /// Write the full cache atomically (temp file + rename)
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written
    /// or renamed into place. The previous cache file is left untouched in that case.
    pub fn save(&self, cache: &ConversationCache) -> Result<()> {
        write_json_atomic(&self.path, cache)
    }
}

/// Serialize `value` as pretty JSON next to `path`, fsync it, then rename over `path`
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };

    let json = serde_json::to_string_pretty(value).context("Failed to serialize cache")?;

    // Unique temp name per writer; concurrent saves never share a temp file
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(json.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .with_context(|| format!("Failed to write temp file: {}", temp.path().display()))?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file into {}", path.display()))?;

    Ok(())
}
