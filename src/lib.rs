//! Conversation Scanner - Index Claude Code conversation logs into a parent/child forest
//!
//! This library scans the per-project conversation logs under `~/.claude/projects/` and
//! maintains a persistent metadata cache for them. It supports:
//!
//! - Decoding Claude's flattened project directory names back into real paths
//! - Extracting titles, summaries and lineage hints from JSONL logs
//! - Resolving which conversation continues which, by record references or leaf ids
//! - Incremental scans that only read new files, and full rebuilds
//! - Rendering the cached conversations as a forest or a single lineage chain
//!
//! # Example
//!
//! ```no_run
//! use conversation_scanner::{ScanConfig, Scanner};
//!
//! let config = ScanConfig::resolve(None, None)?;
//! let scanner = Scanner::from_config(config);
//! let outcome = scanner.scan_incremental()?;
//! println!("{} conversations ({} updated)", outcome.report.total_count, outcome.report.updated_count);
//!
//! for root in scanner.tree() {
//!     println!("{} ({} in thread)", root.conversation.display_title(), root.subtree_size());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod index_storage;
pub mod indexer;
pub mod models;
pub mod parsers;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use index_storage::{CacheStore, ConversationCache, DisplayNames, NameOverrides};
pub use indexer::{FullReport, IncrementalReport, PathDecoder, ScanError, ScanOutcome, Scanner};
pub use models::{ConversationMetadata, ConversationNode};
pub use parsers::parse_conversation_file;
pub use utils::paths::{encode_project_dir, naive_decode};
