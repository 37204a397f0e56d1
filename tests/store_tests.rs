//! Integration tests for the store's core behaviour.
//!
//! Tests insertion, tagging, linking, search, traversal, export and counts
//! through the public API.

mod common;

use common::TestEnv;
use serde_json::{Value, json};
use shelf::{Entry, EntryType, ExportFormat, Store, StoreExportExt, StoreQueryExt};
use std::collections::HashMap;
use std::fs;

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_entries_survive_reopen() {
    let mut env = TestEnv::new();
    let entry = env.knowledge("K-001", "DLI Routing Pattern");
    env.store.add_tag("K-001", "routing").unwrap();

    let path = env.db_path();
    drop(env.store);

    let store = Store::open(&path).unwrap();
    assert_eq!(store.get("K-001").unwrap(), Some(entry));
    assert_eq!(store.tags("K-001").unwrap(), vec!["routing"]);
}

#[test]
fn test_init_reopens_existing_store() {
    let mut env = TestEnv::new();
    env.knowledge("K-001", "Kept");

    let store = Store::init(&env.db_path()).unwrap();
    assert!(store.exists("K-001").unwrap());
}

#[test]
fn test_timestamps_set_at_insert() {
    let mut env = TestEnv::new();

    let first = env.knowledge("K-001", "First");
    let second = env.knowledge("K-002", "Second");

    assert_eq!(first.created_at, first.updated_at);
    assert!(second.created_at >= first.created_at);
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_search_matches_title() {
    let mut env = TestEnv::new();
    env.knowledge_with_content("A", "Routing Pattern", "tiers");
    env.knowledge_with_content("B", "Unrelated", "nothing");

    assert_eq!(env.search_ids("Routing"), vec!["A"]);
}

#[test]
fn test_search_empty_returns_all_newest_first() {
    let mut env = TestEnv::new();
    env.knowledge_with_content("A", "Routing Pattern", "tiers");
    env.knowledge_with_content("B", "Unrelated", "nothing");

    assert_eq!(env.search_ids(""), vec!["B", "A"]);
}

#[test]
fn test_search_matches_content() {
    let mut env = TestEnv::new();
    env.knowledge_with_content("K-001", "Universal Inbox", "Watch directory, classify, route");
    env.knowledge_with_content("K-002", "Library System", "SQLite-based knowledge management");

    assert_eq!(env.search_ids("sqlite"), vec!["K-002"]);
    assert_eq!(env.search_ids("route"), vec!["K-001"]);
}

#[test]
fn test_search_does_not_mutate() {
    let mut env = TestEnv::new();
    env.knowledge("K-001", "Routing");

    let before = env.store.list(None).unwrap();
    env.search_ids("Routing");
    env.search_ids("");
    assert_eq!(env.store.list(None).unwrap(), before);
}

// =============================================================================
// Relationship Traversal Tests
// =============================================================================

#[test]
fn test_related_entries_are_directed() {
    let mut env = TestEnv::new();
    let x = env.knowledge("X", "Library System");
    let y = env.decision("Y", "Use SQLite");
    env.link(&x, &y, "implements");

    assert!(env
        .related_ids("X")
        .contains(&("Y".to_string(), "implements".to_string())));
    assert!(env.related_ids("Y").iter().all(|(id, _)| id != "X"));
}

#[test]
fn test_related_entries_one_hop_only() {
    let mut env = TestEnv::new();
    let a = env.knowledge("A", "A");
    let b = env.knowledge("B", "B");
    let c = env.knowledge("C", "C");
    env.link(&a, &b, "relates_to");
    env.link(&b, &c, "relates_to");

    assert_eq!(env.related_ids("A"), vec![("B".to_string(), "relates_to".to_string())]);
}

#[test]
fn test_related_entries_multiple_types_same_pair() {
    let mut env = TestEnv::new();
    let a = env.knowledge("A", "A");
    let b = env.knowledge("B", "B");
    env.link(&a, &b, "relates_to");
    env.link(&a, &b, "implements");

    assert_eq!(
        env.related_ids("A"),
        vec![
            ("B".to_string(), "relates_to".to_string()),
            ("B".to_string(), "implements".to_string()),
        ]
    );
}

#[test]
fn test_related_entries_unknown_entry_is_empty() {
    let env = TestEnv::new();
    assert!(env.related_ids("nope").is_empty());
}

// =============================================================================
// Export Tests
// =============================================================================

#[test]
fn test_export_roundtrip_fields() {
    let mut env = TestEnv::new();
    let mut inserted = vec![
        env.knowledge("K-001", "DLI Routing Pattern"),
        env.decision("D-001", "Use SQLite for Library"),
    ];
    inserted.push(
        env.store
            .insert_entry(
                "P-001",
                EntryType::Pattern,
                "Universal Inbox",
                "Watch, classify, route",
                Some(json!({"source": "meeting", "attendees": 3})),
                Some(0.0),
            )
            .unwrap(),
    );

    let dest = env.out_path("library_export.json");
    assert_eq!(env.store.export_all(&dest).unwrap(), 3);

    let exported: Vec<Entry> = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(exported, inserted);
    for entry in &exported {
        assert!(entry.updated_at >= entry.created_at);
    }
}

#[test]
fn test_export_field_names_are_columns() {
    let mut env = TestEnv::new();
    env.decision("D-001", "Use SQLite");

    let dest = env.out_path("library_export.json");
    env.store.export_all(&dest).unwrap();

    let records: Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    let record = records[0].as_object().unwrap();
    let mut keys: Vec<&str> = record.keys().map(|k| k.as_str()).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "confidence",
            "content",
            "created_at",
            "entry_id",
            "entry_type",
            "metadata",
            "title",
            "updated_at"
        ]
    );
    assert_eq!(record["metadata"]["rationale"], "Because");
    assert_eq!(record["confidence"], 1.0);
}

#[test]
fn test_export_yaml_explicit_format() {
    let mut env = TestEnv::new();
    let entry = env.knowledge("K-001", "Routing");

    let dest = env.out_path("snapshot.txt");
    assert_eq!(env.store.export_all_as(&dest, ExportFormat::Yaml).unwrap(), 1);

    let exported: Vec<Entry> = serde_yaml::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(exported, vec![entry]);
}

#[test]
fn test_export_is_a_snapshot() {
    let mut env = TestEnv::new();
    env.knowledge("K-001", "Before");

    let dest = env.out_path("export.json");
    env.store.export_all(&dest).unwrap();
    env.knowledge("K-002", "After");

    let exported: Vec<Entry> = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].entry_id, "K-001");
}

// =============================================================================
// Aggregate Tests
// =============================================================================

#[test]
fn test_counts_by_type() {
    let mut env = TestEnv::new();
    env.knowledge("K-001", "A");
    env.knowledge("K-002", "B");
    env.decision("D-001", "C");

    let expected: HashMap<String, usize> =
        [("knowledge".to_string(), 2), ("decision".to_string(), 1)].into_iter().collect();
    assert_eq!(env.store.counts_by_type().unwrap(), expected);
}

#[test]
fn test_counts_include_open_vocabulary_types() {
    let mut env = TestEnv::new();
    env.entry_of_type("R-001", EntryType::Other("als_run".to_string()));
    env.entry_of_type("A-001", EntryType::Achievement);

    let counts = env.store.counts_by_type().unwrap();
    assert_eq!(counts.get("als_run"), Some(&1));
    assert_eq!(counts.get("achievement"), Some(&1));
}

#[test]
fn test_counts_empty_store() {
    let env = TestEnv::new();
    assert!(env.store.counts_by_type().unwrap().is_empty());
}

// =============================================================================
// Workflow Tests
// =============================================================================

#[test]
fn test_full_library_workflow() {
    let mut env = TestEnv::new();

    env.store
        .insert_knowledge(
            "K-001",
            "DLI Routing Pattern",
            "Three-tier routing: Pattern matching -> Cheap model -> Expensive model.",
            Some(0.95),
        )
        .unwrap();
    env.store
        .insert_knowledge(
            "K-002",
            "Universal Inbox Pattern",
            "Single entry point for all file types.",
            Some(0.9),
        )
        .unwrap();
    env.store
        .insert_knowledge("K-003", "Library System", "SQLite-based knowledge management.", Some(1.0))
        .unwrap();
    env.store
        .insert_decision(
            "D-001",
            "Use SQLite for Library",
            "Chose SQLite over PostgreSQL for library storage.",
            "Lightweight, no server needed.",
        )
        .unwrap();

    for (id, tag) in [
        ("K-001", "dli"),
        ("K-001", "routing"),
        ("K-001", "cost-optimization"),
        ("K-002", "inbox"),
        ("K-002", "automation"),
        ("K-003", "library"),
        ("D-001", "architecture"),
    ] {
        env.store.add_tag(id, tag).unwrap();
    }

    env.store.link_entries("K-003", "D-001", "implements").unwrap();
    env.store.link_entries("K-001", "K-002", "relates_to").unwrap();

    assert_eq!(env.search_ids("routing"), vec!["K-001"]);
    assert_eq!(
        env.related_ids("K-003"),
        vec![("D-001".to_string(), "implements".to_string())]
    );

    let dest = env.out_path("library_export.json");
    assert_eq!(env.store.export_all(&dest).unwrap(), 4);

    let summary = env.store.summary().unwrap();
    assert_eq!(summary.entries, 4);
    assert_eq!(summary.tags, 7);
    assert_eq!(summary.relationships, 2);
    assert_eq!(summary.by_type.get("knowledge"), Some(&3));
    assert_eq!(summary.by_type.get("decision"), Some(&1));
}
