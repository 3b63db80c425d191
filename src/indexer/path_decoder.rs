//! Best-effort decoding of flattened project directory names, with memoization.
//!
//! Claude names each project directory after its working directory with `/`, `_` and `.`
//! all flattened to `-`, so `-Users-me-my-app` could be `/Users/me/my_app` or
//! `/Users/me/my/app`. Decoding is a two-tier decision:
//!
//! - **Confident**: no known-ambiguous pattern matches; the naive decode is cached.
//! - **Needs verification**: a pattern matches. The first line of the first log in the
//!   directory is read for its `cwd`. A verified answer is cached; an unverified guess is
//!   returned but not cached, so it is retried on the next scan.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::models::UNKNOWN_SOURCE_DIRECTORY;
use crate::parsers::read_first_line_cwd;
use crate::utils::{is_log_file, naive_decode};

/// Substrings suggesting the original path contained `_` or `.` rather than `/`
pub const DEFAULT_AMBIGUOUS_PATTERNS: &[&str] =
    &["--", "node-modules", "site-packages", "-my-", "-test-", "-data-"];

/// Outcome of decoding an encoded name without touching the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPath {
    Confident(String),
    NeedsVerification(String),
}

/// Path decoder with an append-only, process-lifetime cache
///
/// Shared across scans behind an `Arc`. Reads take a shared lock; each successful decode
/// inserts a single key under the write lock.
#[derive(Debug)]
pub struct PathDecoder {
    ambiguous_patterns: Vec<String>,
    cache: RwLock<HashMap<String, String>>,
    computations: AtomicUsize,
}

impl Default for PathDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathDecoder {
    pub fn new() -> Self {
        Self::with_patterns(DEFAULT_AMBIGUOUS_PATTERNS.iter().map(|p| p.to_string()))
    }

    pub fn with_patterns(patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            ambiguous_patterns: patterns.into_iter().filter(|p| !p.is_empty()).collect(),
            cache: RwLock::new(HashMap::new()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Decode without I/O, classifying the result. `None` when the name carries no path.
    pub fn classify(&self, encoded: &str) -> Option<DecodedPath> {
        let naive = naive_decode(encoded)?.to_string_lossy().to_string();
        if self.ambiguous_patterns.iter().any(|pattern| encoded.contains(pattern.as_str())) {
            Some(DecodedPath::NeedsVerification(naive))
        } else {
            Some(DecodedPath::Confident(naive))
        }
    }

    /// Decode an encoded project directory name into a best-guess absolute path
    ///
    /// `project_dir` is the directory on disk, used only when verification is needed.
    /// Returns `"unknown"` when nothing can be inferred.
    pub fn decode(&self, encoded: &str, project_dir: Option<&Path>) -> String {
        if let Some(hit) = self.cached(encoded) {
            return hit;
        }
        self.computations.fetch_add(1, Ordering::Relaxed);

        match self.classify(encoded) {
            None => UNKNOWN_SOURCE_DIRECTORY.to_string(),
            Some(DecodedPath::Confident(path)) => {
                self.remember(encoded, &path);
                path
            }
            Some(DecodedPath::NeedsVerification(guess)) => {
                match project_dir.and_then(first_log_file).and_then(|f| read_first_line_cwd(&f)) {
                    Some(cwd) => {
                        self.remember(encoded, &cwd);
                        cwd
                    }
                    None => {
                        debug!(encoded, guess = %guess, "ambiguous project directory left unverified");
                        guess
                    }
                }
            }
        }
    }

    /// Memoized value for an encoded name, if any
    pub fn cached(&self, encoded: &str) -> Option<String> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).get(encoded).cloned()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of decodes that missed the cache
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn remember(&self, encoded: &str, decoded: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(encoded.to_string())
            .or_insert_with(|| decoded.to_string());
    }
}

/// Lexicographically first regular `.jsonl` file in a project directory
fn first_log_file(project_dir: &Path) -> Option<PathBuf> {
    fs::read_dir(project_dir)
        .ok()?
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_log_file(path))
        .min()
}
