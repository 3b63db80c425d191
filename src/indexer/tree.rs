//! Conversation forest: children rebuild, cycle breaking, forest and lineage queries.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{ConversationMap, ConversationMetadata, ConversationNode};

/// Clear parent pointers that would make a conversation its own ancestor
///
/// Walks up from every conversation in id order. When the walk reaches a conversation
/// already on the current path, the conversation whose pointer closed the loop becomes a
/// root. Returns the ids whose parent was cleared.
pub fn break_cycles(conversations: &mut ConversationMap) -> Vec<String> {
    let mut settled: HashSet<String> = HashSet::new();
    let mut broken = Vec::new();
    let ids: Vec<String> = conversations.keys().cloned().collect();

    for start in ids {
        if settled.contains(&start) {
            continue;
        }

        let mut path: Vec<String> = Vec::new();
        let mut on_path: HashSet<String> = HashSet::new();
        let mut current = start;

        loop {
            if settled.contains(&current) {
                break;
            }
            path.push(current.clone());
            on_path.insert(current.clone());

            let Some(parent) = conversations.get(&current).and_then(|m| m.parent_id.clone())
            else {
                break;
            };
            if !conversations.contains_key(&parent) {
                break;
            }
            if on_path.contains(&parent) {
                if let Some(meta) = conversations.get_mut(&current) {
                    warn!(id = %current, parent = %parent, "breaking parent cycle");
                    meta.parent_id = None;
                }
                broken.push(current);
                break;
            }
            current = parent;
        }

        settled.extend(path);
    }

    broken
}

/// Recompute every `children` list from the full set of parent pointers
///
/// Runs after every scan. Cycles are broken first, self-parents are cleared, and a parent
/// id that is not in the set leaves the child as a root without touching any list.
pub fn rebuild_children(conversations: &mut ConversationMap) {
    for meta in conversations.values_mut() {
        meta.children.clear();
        if meta.parent_id.as_deref() == Some(meta.id.as_str()) {
            meta.parent_id = None;
        }
    }

    break_cycles(conversations);

    let links: Vec<(String, String)> = conversations
        .values()
        .filter_map(|meta| meta.parent_id.clone().map(|parent| (parent, meta.id.clone())))
        .collect();

    for (parent, child) in links {
        if let Some(parent_meta) = conversations.get_mut(&parent) {
            parent_meta.children.push(child);
        }
    }
}

/// Whether a conversation is a root of the forest (no parent, or parent unknown)
pub fn is_root(meta: &ConversationMetadata, conversations: &ConversationMap) -> bool {
    match &meta.parent_id {
        Some(parent) => !conversations.contains_key(parent),
        None => true,
    }
}

fn newest_first(a: &ConversationMetadata, b: &ConversationMetadata) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Build the nested forest, roots and every child level sorted newest-first
///
/// Expects `children` lists to be current (see [`rebuild_children`]). Built bottom-up with
/// an explicit stack, so deep chains cannot overflow the call stack.
pub fn build_forest(conversations: &ConversationMap) -> Vec<ConversationNode> {
    let mut roots: Vec<&ConversationMetadata> =
        conversations.values().filter(|meta| is_root(meta, conversations)).collect();
    roots.sort_by(|a, b| newest_first(a, b));

    // Post-order over each root's subtree
    let mut order: Vec<&str> = Vec::with_capacity(conversations.len());
    let mut visited: HashSet<&str> = HashSet::new();
    for root in &roots {
        let mut stack: Vec<(&str, bool)> = vec![(root.id.as_str(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            if let Some(meta) = conversations.get(id) {
                for child in &meta.children {
                    if conversations.contains_key(child) && !visited.contains(child.as_str()) {
                        stack.push((child.as_str(), false));
                    }
                }
            }
        }
    }

    let mut built: HashMap<&str, ConversationNode> = HashMap::with_capacity(order.len());
    for id in order {
        let Some(meta) = conversations.get(id) else {
            continue;
        };
        let mut children: Vec<ConversationNode> =
            meta.children.iter().filter_map(|child| built.remove(child.as_str())).collect();
        children.sort_by(|a, b| newest_first(&a.conversation, &b.conversation));
        built.insert(id, ConversationNode { conversation: meta.clone(), children });
    }

    roots.iter().filter_map(|root| built.remove(root.id.as_str())).collect()
}

/// Conversations from the root down to `id`; empty if `id` is unknown
pub fn lineage(conversations: &ConversationMap, id: &str) -> Vec<ConversationMetadata> {
    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = conversations.get(id);

    while let Some(meta) = current {
        if !seen.insert(meta.id.as_str()) {
            break;
        }
        chain.push(meta.clone());
        current = meta.parent_id.as_deref().and_then(|parent| conversations.get(parent));
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn conversation(id: &str, parent: Option<&str>, created_secs: i64) -> ConversationMetadata {
        let mut meta = ConversationMetadata::new(id, format!("/p/{}.jsonl", id));
        meta.parent_id = parent.map(str::to_string);
        meta.created_at = DateTime::<Utc>::from_timestamp(created_secs, 0).unwrap();
        meta
    }

    fn map(entries: Vec<ConversationMetadata>) -> ConversationMap {
        entries.into_iter().map(|m| (m.id.clone(), m)).collect()
    }

    #[test]
    fn test_rebuild_children_matches_parent_pointers() {
        let mut conversations = map(vec![
            conversation("a", None, 1),
            conversation("b", Some("a"), 2),
            conversation("c", Some("a"), 3),
            conversation("d", Some("c"), 4),
        ]);
        conversations.get_mut("d").unwrap().children = vec!["stale".to_string()];

        rebuild_children(&mut conversations);

        assert_eq!(conversations["a"].children, vec!["b", "c"]);
        assert_eq!(conversations["c"].children, vec!["d"]);
        assert!(conversations["d"].children.is_empty());
        for meta in conversations.values() {
            for child in &meta.children {
                assert_eq!(conversations[child].parent_id.as_deref(), Some(meta.id.as_str()));
            }
        }
    }

    #[test]
    fn test_rebuild_drops_children_of_removed_entries() {
        let mut conversations = map(vec![conversation("a", None, 1), conversation("b", Some("a"), 2)]);
        rebuild_children(&mut conversations);
        assert_eq!(conversations["a"].children, vec!["b"]);

        conversations.remove("b");
        rebuild_children(&mut conversations);
        assert!(conversations["a"].children.is_empty());
    }

    #[test]
    fn test_break_two_node_cycle() {
        let mut conversations =
            map(vec![conversation("a", Some("b"), 1), conversation("b", Some("a"), 2)]);

        let broken = break_cycles(&mut conversations);

        assert_eq!(broken.len(), 1);
        let roots = conversations.values().filter(|m| m.parent_id.is_none()).count();
        assert_eq!(roots, 1);
    }

    #[test]
    fn test_break_longer_cycle_with_tail() {
        let mut conversations = map(vec![
            conversation("a", Some("b"), 1),
            conversation("b", Some("c"), 2),
            conversation("c", Some("a"), 3),
            conversation("tail", Some("a"), 4),
        ]);

        rebuild_children(&mut conversations);

        for start in conversations.keys() {
            let mut seen = HashSet::new();
            let mut current = Some(start.clone());
            while let Some(id) = current {
                assert!(seen.insert(id.clone()), "cycle through {}", id);
                current = conversations.get(&id).and_then(|m| m.parent_id.clone());
            }
        }
        assert_eq!(conversations["tail"].parent_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_self_parent_is_cleared() {
        let mut conversations = map(vec![conversation("a", Some("a"), 1)]);
        rebuild_children(&mut conversations);
        assert_eq!(conversations["a"].parent_id, None);
        assert!(conversations["a"].children.is_empty());
    }

    #[test]
    fn test_forest_sorted_newest_first() {
        let mut conversations = map(vec![
            conversation("old-root", None, 10),
            conversation("new-root", None, 30),
            conversation("orphan", Some("missing"), 20),
            conversation("child-early", Some("old-root"), 11),
            conversation("child-late", Some("old-root"), 15),
            conversation("grandchild", Some("child-early"), 12),
        ]);
        rebuild_children(&mut conversations);

        let forest = build_forest(&conversations);
        let roots: Vec<_> = forest.iter().map(|n| n.conversation.id.as_str()).collect();
        assert_eq!(roots, vec!["new-root", "orphan", "old-root"]);

        let old_root = &forest[2];
        let children: Vec<_> = old_root.children.iter().map(|n| n.conversation.id.as_str()).collect();
        assert_eq!(children, vec!["child-late", "child-early"]);
        assert_eq!(old_root.children[1].children[0].conversation.id, "grandchild");
        assert_eq!(forest.iter().map(|n| n.subtree_size()).sum::<usize>(), 6);
    }

    #[test]
    fn test_forest_handles_deep_chains() {
        let mut entries = vec![conversation("n0", None, 0)];
        for i in 1..5_000 {
            entries.push(conversation(&format!("n{}", i), Some(&format!("n{}", i - 1)), i));
        }
        let mut conversations = map(entries);
        rebuild_children(&mut conversations);

        let forest = build_forest(&conversations);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].subtree_size(), 5_000);
    }

    #[test]
    fn test_lineage_root_to_id() {
        let conversations = map(vec![
            conversation("root", None, 1),
            conversation("mid", Some("root"), 2),
            conversation("leaf", Some("mid"), 3),
        ]);

        let chain: Vec<_> = lineage(&conversations, "leaf").into_iter().map(|m| m.id).collect();
        assert_eq!(chain, vec!["root", "mid", "leaf"]);
        assert_eq!(lineage(&conversations, "root").len(), 1);
        assert!(lineage(&conversations, "unknown").is_empty());
    }

    #[test]
    fn test_lineage_stops_at_missing_parent_and_cycles() {
        let conversations = map(vec![
            conversation("a", Some("gone"), 1),
            conversation("x", Some("y"), 2),
            conversation("y", Some("x"), 3),
        ]);

        assert_eq!(lineage(&conversations, "a").len(), 1);
        let chain: Vec<_> = lineage(&conversations, "x").into_iter().map(|m| m.id).collect();
        assert_eq!(chain, vec!["y", "x"]);
    }
}
