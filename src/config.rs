//! Scanner configuration

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::index_storage::display_names::NAMES_FILENAME;
use crate::index_storage::persistence::CACHE_FILENAME;
use crate::indexer::path_decoder::DEFAULT_AMBIGUOUS_PATTERNS;
use crate::utils::get_claude_dir;

const APP_CACHE_DIR: &str = "conversation-scanner";

/// How long a scan waits for another process holding the cache lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory holding `projects/`
    pub claude_dir: PathBuf,
    pub cache_file: PathBuf,
    pub lock_file: PathBuf,
    pub names_file: PathBuf,
    pub lock_timeout: Duration,
    pub ambiguous_patterns: Vec<String>,
}

impl ScanConfig {
    /// Config with every file placed next to `cache_file`
    pub fn new(claude_dir: impl Into<PathBuf>, cache_file: impl Into<PathBuf>) -> Self {
        let cache_file = cache_file.into();
        let lock_file = sibling(&cache_file, ".lock");
        let names_file = cache_file.with_file_name(NAMES_FILENAME);
        Self {
            claude_dir: claude_dir.into(),
            cache_file,
            lock_file,
            names_file,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            ambiguous_patterns: DEFAULT_AMBIGUOUS_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Resolve defaults from the environment, with optional overrides
    ///
    /// The Claude dir falls back to `$CLAUDE_CONFIG_DIR` or `~/.claude`; the cache file to
    /// the platform cache directory. The cache directory is created here, so a failure is
    /// reported before any scan starts.
    ///
    /// # Errors
    ///
    /// Returns an error if no Claude dir can be determined or the cache directory cannot be
    /// created.
    pub fn resolve(claude_dir: Option<PathBuf>, cache_file: Option<PathBuf>) -> Result<Self> {
        let claude_dir = match claude_dir {
            Some(dir) => dir,
            None => get_claude_dir()?,
        };
        let cache_file = match cache_file {
            Some(file) => file,
            None => default_cache_dir(&claude_dir)?.join(CACHE_FILENAME),
        };

        if let Some(parent) = cache_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        Ok(Self::new(claude_dir, cache_file))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Hash of the Claude dir so caches for different dirs never collide
fn compute_path_hash(path: &Path) -> String {
    // Canonicalize when possible so relative and symlinked spellings share a cache
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..12].to_string()
}

/// Platform-specific cache directory for a specific Claude directory
pub fn default_cache_dir(claude_dir: &Path) -> Result<PathBuf> {
    let cache_base = dirs::cache_dir().context("Failed to get platform cache directory")?;
    Ok(cache_base.join(APP_CACHE_DIR).join(compute_path_hash(claude_dir)))
}
