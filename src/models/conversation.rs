use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a project directory cannot be decoded to a real path
pub const UNKNOWN_SOURCE_DIRECTORY: &str = "unknown";

/// Every known conversation keyed by id; sorted so scans iterate deterministically
pub type ConversationMap = BTreeMap<String, ConversationMetadata>;

/// Cached metadata for one conversation log file
///
/// Filesystem-derived fields (`created_at`, `last_modified_at`, `file_size_bytes`,
/// `source_directory`, `file_path`) are refreshed on every scan. Content-derived fields are
/// only rewritten when the file is fully parsed. `children` is derived from every other
/// entry's `parent_id` and is rebuilt wholesale after each scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub file_size_bytes: u64,
    pub source_directory: String,
    #[serde(default)]
    pub is_continuation_summary: bool,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default)]
    pub record_count: usize,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub leaf_id: Option<String>,
    #[serde(default)]
    pub parent_leaf_id: Option<String>,
    pub file_path: PathBuf,
}

impl ConversationMetadata {
    /// Create an entry with only identity and path set; everything else is empty
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id: id.into(),
            parent_id: None,
            children: Vec::new(),
            created_at: epoch,
            last_modified_at: epoch,
            file_size_bytes: 0,
            source_directory: UNKNOWN_SOURCE_DIRECTORY.to_string(),
            is_continuation_summary: false,
            is_sidechain: false,
            record_count: 0,
            title: None,
            summary: None,
            custom_name: None,
            leaf_id: None,
            parent_leaf_id: None,
            file_path: file_path.into(),
        }
    }

    /// Label to show for this conversation
    ///
    /// Prefers the user's custom name, then the extracted title, then the summary,
    /// and finally falls back to the id.
    pub fn display_title(&self) -> &str {
        self.custom_name
            .as_deref()
            .or(self.title.as_deref())
            .or(self.summary.as_deref())
            .unwrap_or(&self.id)
    }

    /// Whether size or mtime differ from another snapshot of the same file
    pub fn stat_changed(&self, other: &ConversationMetadata) -> bool {
        self.file_size_bytes != other.file_size_bytes
            || self.last_modified_at != other.last_modified_at
    }
}

/// One node of the conversation forest returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationNode {
    pub conversation: ConversationMetadata,
    pub children: Vec<ConversationNode>,
}

impl ConversationNode {
    /// Number of conversations in this subtree, including the node itself
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}
