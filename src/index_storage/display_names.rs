//! User-assigned display names for conversations.
//!
//! Overrides live outside the scan cache so a full rebuild never loses them. The scanner
//! receives them through the [`DisplayNames`] trait, which lets tests and embedders pass a
//! plain map instead of a file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use super::lock::CacheLock;
use super::persistence::write_json_atomic;

/// Default overrides file name inside the cache directory
pub const NAMES_FILENAME: &str = "conversation-names.json";

/// Source of custom display names, keyed by conversation id
pub trait DisplayNames: Send + Sync {
    fn custom_name(&self, id: &str) -> Option<String>;
}

impl DisplayNames for HashMap<String, String> {
    fn custom_name(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl DisplayNames for BTreeMap<String, String> {
    fn custom_name(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

/// File-backed display-name overrides (`{"<id>": "<name>", ...}`)
#[derive(Debug, Clone, Default)]
pub struct NameOverrides {
    path: PathBuf,
    names: BTreeMap<String, String>,
}

impl NameOverrides {
    /// Load overrides; a missing or unreadable file yields an empty set
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let names = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(file = %path.display(), error = %e, "ignoring unreadable display names");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, names }
    }

    /// Load, set one name and save while holding the cache lock at `lock_file`
    ///
    /// Writers going through here never lose each other's updates, whether they run in
    /// one process or several.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired within `timeout` or the file cannot
    /// be written.
    pub fn update(
        path: impl Into<PathBuf>,
        lock_file: &Path,
        timeout: Duration,
        id: &str,
        name: &str,
    ) -> Result<Self> {
        let _lock = CacheLock::acquire(lock_file, timeout)?;
        let mut overrides = Self::load(path);
        overrides.set(id, name);
        overrides.save()?;
        Ok(overrides)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set a name; blank names remove the override
    pub fn set(&mut self, id: &str, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.names.remove(id);
        } else {
            self.names.insert(id.to_string(), name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Persist atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.names)
            .with_context(|| format!("Failed to save display names: {}", self.path.display()))
    }
}

impl DisplayNames for NameOverrides {
    fn custom_name(&self, id: &str) -> Option<String> {
        self.names.get(id).cloned()
    }
}
