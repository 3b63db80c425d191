//! Parent resolution between conversations.
//!
//! Primary: the first record whose `parentUuid` belongs to a *different* conversation
//! decides the parent. Fallback, only when the primary finds nothing: the conversation's
//! `parent_leaf_id` matched against other conversations' `leaf_id`.

use std::collections::HashMap;

use tracing::info;

use crate::indexer::xref::CrossReferenceIndex;
use crate::models::ConversationMap;
use crate::parsers::RecordLinks;

/// Counts of how parents were found during one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub by_reference: usize,
    pub by_leaf: usize,
    pub unresolved: usize,
}

/// Conversations indexed by their `leaf_id`, in id order
#[derive(Debug, Default)]
pub struct LeafIndex {
    by_leaf: HashMap<String, Vec<String>>,
}

impl LeafIndex {
    pub fn build(conversations: &ConversationMap) -> Self {
        let mut by_leaf: HashMap<String, Vec<String>> = HashMap::new();
        for (id, meta) in conversations {
            if let Some(leaf) = &meta.leaf_id {
                by_leaf.entry(leaf.clone()).or_default().push(id.clone());
            }
        }
        Self { by_leaf }
    }

    /// First conversation other than `id` whose leaf matches `parent_leaf_id`
    pub fn parent_for(&self, id: &str, parent_leaf_id: Option<&str>) -> Option<String> {
        self.by_leaf.get(parent_leaf_id?)?.iter().find(|candidate| *candidate != id).cloned()
    }
}

/// First cross-conversation parent reference in record order
pub fn resolve_by_reference(
    id: &str,
    links: &RecordLinks,
    xref: &CrossReferenceIndex,
) -> Option<String> {
    links
        .parent_refs
        .iter()
        .filter_map(|parent_ref| xref.owner(parent_ref))
        .find(|owner| *owner != id)
        .map(str::to_string)
}

/// Resolve `parent_id` for every conversation (full scan)
///
/// Overwrites any previous `parent_id` of every conversation present in `links`. Entries
/// without links were carried over unparsed and keep their parent. A conversation is never
/// assigned itself.
pub fn resolve_parents(
    conversations: &mut ConversationMap,
    links: &HashMap<String, RecordLinks>,
    xref: &CrossReferenceIndex,
) -> ResolutionStats {
    let leaf_index = LeafIndex::build(conversations);
    let mut stats = ResolutionStats::default();

    for (id, meta) in conversations.iter_mut() {
        let Some(record_links) = links.get(id) else {
            continue;
        };
        let by_reference = resolve_by_reference(id, record_links, xref);
        let parent = match by_reference {
            Some(parent) => {
                stats.by_reference += 1;
                Some(parent)
            }
            None => {
                let by_leaf = leaf_index.parent_for(id, meta.parent_leaf_id.as_deref());
                if by_leaf.is_some() {
                    stats.by_leaf += 1;
                } else {
                    stats.unresolved += 1;
                }
                by_leaf
            }
        };

        meta.parent_id = parent.filter(|p| p != id);
    }

    info!(
        by_reference = stats.by_reference,
        by_leaf = stats.by_leaf,
        unresolved = stats.unresolved,
        "resolved conversation parents"
    );
    stats
}

/// Opportunistic leaf-only resolution for conversations first seen in an incremental scan
///
/// Entries that already have a parent are left alone. Returns how many were resolved.
pub fn resolve_new_by_leaf(conversations: &mut ConversationMap, new_ids: &[String]) -> usize {
    let leaf_index = LeafIndex::build(conversations);
    let mut resolved = 0;

    for id in new_ids {
        let Some(meta) = conversations.get_mut(id) else {
            continue;
        };
        if meta.parent_id.is_some() {
            continue;
        }
        if let Some(parent) = leaf_index.parent_for(id, meta.parent_leaf_id.as_deref()) {
            meta.parent_id = Some(parent);
            resolved += 1;
        }
    }

    resolved
}
