//! Conversation indexing: discovery, path decoding, parent resolution and tree building
//!
//! # Error Handling Strategy
//!
//! The indexer degrades per item and fails only for the whole run:
//!
//! - **File-level failures**: unreadable logs and project directories are logged with
//!   `warn!` and left out of the pass. Other conversations are still indexed.
//!
//! - **Line-level failures**: delegated to the parsers, which skip malformed lines.
//!
//! - **Run-level failures**: an unlistable projects root or an unavailable cache lock abort
//!   the scan with [`ScanError`] before anything is written.
//!
//! - **Persistence**: a failed save is returned next to the scan result instead of replacing
//!   it, see [`ScanOutcome`].

pub mod lineage;
pub mod path_decoder;
pub mod project_discovery;
pub mod scanner;
pub mod tree;
pub mod xref;

pub use lineage::{ResolutionStats, resolve_new_by_leaf, resolve_parents};
pub use path_decoder::{DecodedPath, PathDecoder};
pub use project_discovery::discover_log_files;
pub use scanner::{FullReport, IncrementalReport, ScanError, ScanOutcome, Scanner};
pub use tree::{build_forest, rebuild_children};
pub use xref::CrossReferenceIndex;
