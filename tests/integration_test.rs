/// End-to-end scan tests against realistic .claude directory layouts
mod common;

use std::collections::HashSet;
use std::fs;

use common::{ClaudeDirBuilder, LogFileBuilder, RecordBuilder, TestCache, realistic_claude_dir};
use conversation_scanner::ConversationNode;

fn flatten(forest: &[ConversationNode]) -> Vec<String> {
    let mut ids = Vec::new();
    let mut stack: Vec<&ConversationNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        ids.push(node.conversation.id.clone());
        stack.extend(node.children.iter());
    }
    ids
}

/// Raw cache file contents with the scan timestamp value blanked out
fn cache_bytes_without_timestamp(cache: &TestCache) -> String {
    let raw = fs::read_to_string(cache.cache_file()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let timestamp = parsed["lastScanTimestamp"].as_str().unwrap().to_string();
    raw.replacen(&timestamp, "", 1)
}

#[test]
fn test_full_scan_builds_expected_tree() {
    let claude_dir = realistic_claude_dir();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();

    let outcome = scanner.scan_full().unwrap();
    assert!(outcome.persisted());
    assert_eq!(outcome.report.total_count, 4);
    assert_eq!(outcome.report.failed_count, 0);

    let snapshot = scanner.cache();
    let conversations = &snapshot.conversations;
    assert_eq!(conversations["child"].parent_id.as_deref(), Some("root"));
    assert_eq!(conversations["grandchild"].parent_id.as_deref(), Some("child"));
    assert_eq!(conversations["root"].parent_id, None);
    assert_eq!(conversations["other"].parent_id, None);
    assert_eq!(conversations["root"].children, vec!["child"]);
    assert_eq!(conversations["root"].source_directory, "/Users/test/webapp");
    assert_eq!(conversations["grandchild"].summary.as_deref(), Some("Login and logout"));

    let chain: Vec<_> = scanner.lineage("grandchild").into_iter().map(|m| m.id).collect();
    assert_eq!(chain, vec!["root", "child", "grandchild"]);
}

#[test]
fn test_forest_contains_every_conversation_exactly_once() {
    let claude_dir = realistic_claude_dir();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();
    scanner.scan_full().unwrap();

    let forest = scanner.tree();
    let ids = flatten(&forest);
    let unique: HashSet<_> = ids.iter().cloned().collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(unique.len(), 4);

    // Every child's parent pointer agrees with its position in the tree
    let mut stack: Vec<&ConversationNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        for child in &node.children {
            assert_eq!(child.conversation.parent_id.as_deref(), Some(node.conversation.id.as_str()));
        }
        stack.extend(node.children.iter());
    }
}

#[test]
fn test_incremental_scan_is_idempotent() {
    let claude_dir = realistic_claude_dir();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();

    scanner.scan_incremental().unwrap();
    let first = cache_bytes_without_timestamp(&cache);

    let outcome = scanner.scan_incremental().unwrap();
    assert_eq!(outcome.report.updated_count, 0);
    assert_eq!(outcome.report.deleted_count, 0);
    assert_eq!(outcome.report.total_count, 4);

    let second = cache_bytes_without_timestamp(&cache);
    assert_eq!(first, second);
}

#[test]
fn test_full_scan_is_deterministic() {
    let claude_dir = realistic_claude_dir();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();

    scanner.scan_full().unwrap();
    let first: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.cache_file()).unwrap()).unwrap();
    scanner.scan_full().unwrap();
    let second: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.cache_file()).unwrap()).unwrap();

    assert_eq!(first["conversations"], second["conversations"]);
    assert_eq!(first["knownIds"], second["knownIds"]);
}

#[test]
fn test_deleted_file_removed_from_cache_and_tree() {
    let claude_dir = ClaudeDirBuilder::new()
        .with_project(
            "-work-app",
            &[
                LogFileBuilder::new("A").with_record(RecordBuilder::user("first").uuid("a1")),
                LogFileBuilder::new("B").with_record(RecordBuilder::user("second").uuid("b1").parent("a1")),
                LogFileBuilder::new("C").with_record(RecordBuilder::user("third").uuid("c1").parent("b1")),
            ],
        )
        .build();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();
    scanner.scan_full().unwrap();
    assert_eq!(scanner.cache().conversations["C"].parent_id.as_deref(), Some("B"));

    fs::remove_file(claude_dir.path().join("projects/-work-app/B.jsonl")).unwrap();
    let outcome = scanner.scan_incremental().unwrap();
    assert_eq!(outcome.report.deleted_count, 1);
    assert_eq!(outcome.report.total_count, 2);

    let snapshot = scanner.cache();
    assert_eq!(snapshot.known_ids.iter().collect::<Vec<_>>(), vec!["A", "C"]);
    assert!(snapshot.conversations["A"].children.is_empty());

    // C's parent is gone, so C surfaces as a root
    let roots: Vec<_> = scanner.tree().into_iter().map(|n| n.conversation.id).collect();
    assert_eq!(roots.len(), 2);
    assert!(roots.contains(&"A".to_string()));
    assert!(roots.contains(&"C".to_string()));

    // A full scan settles the dangling pointer
    scanner.scan_full().unwrap();
    assert_eq!(scanner.cache().conversations["C"].parent_id, None);
}

#[test]
fn test_reference_resolution_beats_leaf_fallback() {
    let claude_dir = ClaudeDirBuilder::new()
        .with_project(
            "-work-app",
            &[
                LogFileBuilder::new("by-leaf")
                    .with_record(RecordBuilder::assistant("leaf owner").uuid("l1").leaf("leaf-x")),
                LogFileBuilder::new("by-ref")
                    .with_record(RecordBuilder::user("record owner").uuid("shared-record")),
                LogFileBuilder::new("target")
                    .with_record(RecordBuilder::summary("Continued", "leaf-x"))
                    .with_record(RecordBuilder::user("go on").uuid("t1").parent("shared-record")),
            ],
        )
        .build();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();

    let outcome = scanner.scan_full().unwrap();
    assert_eq!(scanner.cache().conversations["target"].parent_id.as_deref(), Some("by-ref"));
    assert!(outcome.report.resolution.by_reference >= 1);
}

#[test]
fn test_shared_record_id_owned_by_first_conversation() {
    let claude_dir = ClaudeDirBuilder::new()
        .with_project(
            "-work-app",
            &[
                LogFileBuilder::new("aaa").with_record(RecordBuilder::user("one").uuid("dup")),
                LogFileBuilder::new("bbb").with_record(RecordBuilder::user("two").uuid("dup")),
                LogFileBuilder::new("ccc")
                    .with_record(RecordBuilder::user("three").uuid("c1").parent("dup")),
            ],
        )
        .build();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();
    scanner.scan_full().unwrap();

    let snapshot = scanner.cache();
    assert_eq!(snapshot.conversations["ccc"].parent_id.as_deref(), Some("aaa"));
    assert_eq!(snapshot.conversations["bbb"].parent_id, None);
}

#[test]
fn test_new_conversation_picked_up_incrementally() {
    let claude_dir = realistic_claude_dir();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();
    scanner.scan_incremental().unwrap();

    let project_dir = claude_dir.path().join("projects").join("-Users-test-cli");
    LogFileBuilder::new("fresh")
        .with_record(RecordBuilder::user("Brand new work").uuid("f1"))
        .create_in(&project_dir);

    let outcome = scanner.scan_incremental().unwrap();
    assert_eq!(outcome.report.updated_count, 1);
    assert_eq!(outcome.report.total_count, 5);
    assert_eq!(scanner.cache().conversations["fresh"].title.as_deref(), Some("Brand new work"));

    let newest = scanner.conversations();
    assert_eq!(newest.len(), 5);
    assert!(newest.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[test]
fn test_custom_names_layered_over_titles() {
    let claude_dir = ClaudeDirBuilder::new()
        .with_project(
            "-work-app",
            &[
                LogFileBuilder::new("embedded")
                    .with_record(RecordBuilder::user("Original title"))
                    .with_record(RecordBuilder::custom_title("From the log")),
                LogFileBuilder::new("overridden")
                    .with_record(RecordBuilder::user("Plain title"))
                    .with_record(RecordBuilder::custom_title("Loses to override")),
            ],
        )
        .build();
    let cache = TestCache::new(claude_dir.path());

    let mut names = conversation_scanner::NameOverrides::load(&cache.config.names_file);
    names.set("overridden", "Pinned by user");
    names.save().unwrap();

    let scanner = cache.scanner();
    scanner.scan_full().unwrap();
    let snapshot = scanner.cache();

    assert_eq!(snapshot.conversations["embedded"].display_title(), "From the log");
    assert_eq!(snapshot.conversations["embedded"].title.as_deref(), Some("Original title"));
    assert_eq!(snapshot.conversations["overridden"].display_title(), "Pinned by user");
}

#[test]
fn test_duplicate_ids_across_projects_keep_first() {
    let claude_dir = ClaudeDirBuilder::new()
        .with_project("-a-first", &[LogFileBuilder::new("same").with_record(RecordBuilder::user("from a"))])
        .with_project("-b-second", &[LogFileBuilder::new("same").with_record(RecordBuilder::user("from b"))])
        .build();
    let cache = TestCache::new(claude_dir.path());
    let scanner = cache.scanner();
    scanner.scan_full().unwrap();

    let snapshot = scanner.cache();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.conversations["same"].title.as_deref(), Some("from a"));
    assert_eq!(snapshot.conversations["same"].source_directory, "/a/first");
}
