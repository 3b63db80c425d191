//! The persisted cache document

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ConversationMap;

/// On-disk cache of every known conversation
///
/// `known_ids` and the key set of `conversations` are kept equal after every successful
/// scan. Both are sorted collections so the serialized form is stable between scans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationCache {
    #[serde(default)]
    pub last_scan_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub known_ids: BTreeSet<String>,
    #[serde(default)]
    pub conversations: ConversationMap,
}

impl ConversationCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Make `known_ids` mirror the conversation keys
    pub fn sync_known_ids(&mut self) {
        self.known_ids = self.conversations.keys().cloned().collect();
    }

    /// Whether the id set and conversation keys agree
    pub fn is_consistent(&self) -> bool {
        self.known_ids.len() == self.conversations.len()
            && self.known_ids.iter().all(|id| self.conversations.contains_key(id))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
