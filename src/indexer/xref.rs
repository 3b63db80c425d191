use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::parsers::RecordLinks;

/// Maps every record identifier in the corpus to the conversation containing it
///
/// Only built during a full scan. Fed from the [`RecordLinks`] collected while each file
/// is parsed for metadata, so building it never re-reads a file. When the same record id
/// shows up in several conversations (resumed sessions copy earlier history), the first
/// conversation inserted keeps ownership.
#[derive(Debug, Default)]
pub struct CrossReferenceIndex {
    owners: HashMap<String, String>,
}

impl CrossReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every record id of one conversation
    pub fn insert_conversation(&mut self, conversation_id: &str, links: &RecordLinks) {
        for record_id in &links.record_ids {
            if let Entry::Vacant(slot) = self.owners.entry(record_id.clone()) {
                slot.insert(conversation_id.to_string());
            }
        }
    }

    /// Conversation that owns a record id
    pub fn owner(&self, record_id: &str) -> Option<&str> {
        self.owners.get(record_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
