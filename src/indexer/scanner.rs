//! Scan orchestration: incremental and full scans over the conversation cache.
//!
//! # Error Handling Strategy
//!
//! - **Per-item errors**: malformed lines, unreadable or vanished files and unreadable
//!   project directories are logged and the item is left out of this pass. They never fail
//!   the scan.
//! - **Scan errors** ([`ScanError`]): the projects root exists but cannot be listed, or the
//!   cache lock cannot be acquired. Nothing is written in that case.
//! - **Persistence errors**: the scan result is still returned in [`ScanOutcome`] with
//!   `persist_error` set, so callers can distinguish "scan failed" from "scan succeeded,
//!   save failed".
//!
//! # Concurrency
//!
//! Each scan holds an in-process mutex and an exclusive advisory lock on the cache lock
//! file for its whole load-mutate-save cycle, so two scans can never interleave their
//! writes, whether they come from one process or several.
//!
//! # Incremental vs full
//!
//! Incremental scans only read files they have never seen; known files get a stat refresh.
//! Parents of new conversations are resolved from leaf ids alone, because a cross-reference
//! pass needs every conversation's records. Full scans re-read everything and re-resolve
//! every parent. Run a full scan to pick up references an incremental scan missed.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::index_storage::{CacheLock, CacheStore, ConversationCache, DisplayNames, NameOverrides};
use crate::indexer::lineage::{ResolutionStats, resolve_new_by_leaf, resolve_parents};
use crate::indexer::path_decoder::PathDecoder;
use crate::indexer::project_discovery::discover_log_files;
use crate::indexer::tree::{build_forest, lineage, rebuild_children};
use crate::indexer::xref::CrossReferenceIndex;
use crate::models::{ConversationMap, ConversationMetadata, ConversationNode, ProjectLogFile};
use crate::parsers::{RecordLinks, parse_conversation_file};

/// Failures that abort a scan before anything is written
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to enumerate conversation logs: {0:#}")]
    Enumerate(anyhow::Error),
    #[error("failed to acquire cache lock: {0:#}")]
    Lock(anyhow::Error),
}

/// Result of a scan that ran to completion
#[derive(Debug)]
pub struct ScanOutcome<R> {
    pub report: R,
    /// Set when the scan succeeded but the cache could not be saved
    pub persist_error: Option<anyhow::Error>,
}

impl<R> ScanOutcome<R> {
    pub fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalReport {
    /// New conversations plus known ones whose size or mtime changed
    pub updated_count: usize,
    pub deleted_count: usize,
    pub total_count: usize,
    /// Files that could not be read this pass
    pub failed_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub total_count: usize,
    pub elapsed_ms: u64,
    pub failed_count: usize,
    #[serde(skip)]
    pub resolution: ResolutionStats,
}

/// Top-level coordinator over the cache, the filesystem and the shared path decoder
pub struct Scanner {
    config: ScanConfig,
    store: CacheStore,
    decoder: Arc<PathDecoder>,
    names: Arc<dyn DisplayNames>,
    scan_guard: Mutex<()>,
}

impl Scanner {
    /// Build a scanner with explicitly injected path decoder and display-name source
    pub fn new(config: ScanConfig, decoder: Arc<PathDecoder>, names: Arc<dyn DisplayNames>) -> Self {
        let store = CacheStore::new(&config.cache_file);
        Self { config, store, decoder, names, scan_guard: Mutex::new(()) }
    }

    /// Scanner with a fresh decoder and overrides loaded from `config.names_file`
    pub fn from_config(config: ScanConfig) -> Self {
        let decoder = Arc::new(PathDecoder::with_patterns(config.ambiguous_patterns.clone()));
        let names = Arc::new(NameOverrides::load(&config.names_file));
        Self::new(config, decoder, names)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn path_decoder(&self) -> &Arc<PathDecoder> {
        &self.decoder
    }

    /// Process only filesystem additions and deletions since the last scan
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the cache lock cannot be acquired or the projects root
    /// cannot be listed.
    pub fn scan_incremental(&self) -> Result<ScanOutcome<IncrementalReport>, ScanError> {
        let _guard = self.scan_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = CacheLock::acquire(&self.config.lock_file, self.config.lock_timeout)
            .map_err(ScanError::Lock)?;

        let mut cache = self.store.load();
        let logs = discover_log_files(&self.config.claude_dir).map_err(ScanError::Enumerate)?;

        let current: BTreeSet<&str> = logs.iter().map(|log| log.id.as_str()).collect();
        let mut conversations = std::mem::take(&mut cache.conversations);
        let removed: Vec<String> =
            conversations.keys().filter(|id| !current.contains(id.as_str())).cloned().collect();
        for id in &removed {
            conversations.remove(id);
        }

        let mut report = IncrementalReport { deleted_count: removed.len(), ..Default::default() };
        let mut new_ids = Vec::new();
        let mut source_dirs = SourceDirectories::new(&self.decoder);

        for log in &logs {
            let previous = conversations.get(&log.id).cloned();
            let is_new = previous.is_none();
            let source_directory = source_dirs.decode(log);

            match parse_conversation_file(&log.log_path, source_directory, is_new, previous.as_ref())
            {
                Ok(parsed) => {
                    let mut meta = parsed.metadata;
                    self.apply_display_name(&mut meta);
                    match &previous {
                        None => {
                            new_ids.push(log.id.clone());
                            report.updated_count += 1;
                        }
                        Some(prev) if prev.stat_changed(&meta) => report.updated_count += 1,
                        Some(_) => {}
                    }
                    conversations.insert(log.id.clone(), meta);
                }
                Err(e) => {
                    report.failed_count += 1;
                    if !is_new && !log.log_path.exists() {
                        warn!(id = %log.id, "conversation log vanished during scan");
                        conversations.remove(&log.id);
                        report.deleted_count += 1;
                    } else {
                        warn!(file = %log.log_path.display(), error = %format!("{:#}", e), "skipping unreadable conversation log");
                    }
                }
            }
        }

        let leaf_resolved = resolve_new_by_leaf(&mut conversations, &new_ids);
        rebuild_children(&mut conversations);

        cache.conversations = conversations;
        cache.sync_known_ids();
        cache.last_scan_timestamp = Some(Utc::now());
        report.total_count = cache.len();

        info!(
            updated = report.updated_count,
            deleted = report.deleted_count,
            failed = report.failed_count,
            total = report.total_count,
            leaf_resolved,
            "incremental scan complete"
        );

        Ok(self.persist(&cache, report))
    }

    /// Re-read every log, rebuild cross references and re-resolve every parent
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the cache lock cannot be acquired or the projects root
    /// cannot be listed.
    pub fn scan_full(&self) -> Result<ScanOutcome<FullReport>, ScanError> {
        let _guard = self.scan_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = CacheLock::acquire(&self.config.lock_file, self.config.lock_timeout)
            .map_err(ScanError::Lock)?;
        let started = Instant::now();

        let previous = self.store.load();
        let logs = discover_log_files(&self.config.claude_dir).map_err(ScanError::Enumerate)?;

        let mut conversations = ConversationMap::new();
        let mut links: HashMap<String, RecordLinks> = HashMap::with_capacity(logs.len());
        let mut report = FullReport::default();
        let mut source_dirs = SourceDirectories::new(&self.decoder);

        for log in &logs {
            let prior = previous.conversations.get(&log.id);
            let source_directory = source_dirs.decode(log);
            match parse_conversation_file(&log.log_path, source_directory, true, prior) {
                Ok(parsed) => {
                    let mut meta = parsed.metadata;
                    self.apply_display_name(&mut meta);
                    links.insert(log.id.clone(), parsed.links);
                    conversations.insert(log.id.clone(), meta);
                }
                Err(e) => {
                    report.failed_count += 1;
                    warn!(file = %log.log_path.display(), error = %format!("{:#}", e), "skipping unreadable conversation log");
                    // Still on disk: keep the last good entry rather than dropping it
                    if let Some(prior) = prior.filter(|_| log.log_path.exists()) {
                        conversations.insert(log.id.clone(), prior.clone());
                    }
                }
            }
        }

        let mut xref = CrossReferenceIndex::new();
        for id in conversations.keys() {
            if let Some(record_links) = links.get(id) {
                xref.insert_conversation(id, record_links);
            }
        }

        report.resolution = resolve_parents(&mut conversations, &links, &xref);
        rebuild_children(&mut conversations);

        let mut cache = ConversationCache {
            last_scan_timestamp: Some(Utc::now()),
            known_ids: BTreeSet::new(),
            conversations,
        };
        cache.sync_known_ids();
        report.total_count = cache.len();

        let mut outcome = self.persist(&cache, report);
        outcome.report.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            total = outcome.report.total_count,
            failed = outcome.report.failed_count,
            records_indexed = xref.len(),
            elapsed_ms = outcome.report.elapsed_ms,
            "full scan complete"
        );

        Ok(outcome)
    }

    /// Every cached conversation, newest first
    pub fn conversations(&self) -> Vec<ConversationMetadata> {
        let mut all: Vec<_> = self.store.load().conversations.into_values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// The cached forest; roots and children newest first
    pub fn tree(&self) -> Vec<ConversationNode> {
        let mut conversations = self.store.load().conversations;
        rebuild_children(&mut conversations);
        build_forest(&conversations)
    }

    /// Cached conversations from the root down to `id`; empty if `id` is unknown
    pub fn lineage(&self, id: &str) -> Vec<ConversationMetadata> {
        lineage(&self.store.load().conversations, id)
    }

    /// The cache document as currently persisted
    pub fn cache(&self) -> ConversationCache {
        self.store.load()
    }

    fn apply_display_name(&self, meta: &mut ConversationMetadata) {
        if let Some(name) = self.names.custom_name(&meta.id) {
            meta.custom_name = Some(name);
        }
    }

    fn persist<R>(&self, cache: &ConversationCache, report: R) -> ScanOutcome<R> {
        let persist_error = match self.store.save(cache) {
            Ok(()) => None,
            Err(e) => {
                warn!(cache = %self.store.path().display(), error = %format!("{:#}", e), "scan succeeded but cache could not be saved");
                Some(e)
            }
        };
        ScanOutcome { report, persist_error }
    }
}

/// Decoded project directories for one scan pass
///
/// The shared decoder only memoizes confident and verified answers. Unverified guesses are
/// held here so each project directory is decoded at most once per scan.
struct SourceDirectories<'a> {
    decoder: &'a PathDecoder,
    decoded: HashMap<String, String>,
}

impl<'a> SourceDirectories<'a> {
    fn new(decoder: &'a PathDecoder) -> Self {
        Self { decoder, decoded: HashMap::new() }
    }

    fn decode(&mut self, log: &ProjectLogFile) -> &str {
        self.decoded
            .entry(log.encoded_dir.clone())
            .or_insert_with(|| self.decoder.decode(&log.encoded_dir, log.log_path.parent()))
    }
}
