//! Shared test infrastructure for Shelf integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use shelf::{Entry, EntryType, Store, StoreError, StoreQueryExt};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(&temp_dir.path().join("library.db")).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Path of the store file.
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("library.db")
    }

    /// Path for an output file inside the temp dir.
    pub fn out_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Insert a knowledge entry with default confidence.
    pub fn knowledge(&mut self, id: &str, title: &str) -> Entry {
        self.store
            .insert_knowledge(id, title, &format!("Notes on {}", title), None)
            .expect("Failed to insert knowledge")
    }

    /// Insert a knowledge entry with explicit content.
    pub fn knowledge_with_content(&mut self, id: &str, title: &str, content: &str) -> Entry {
        self.store
            .insert_knowledge(id, title, content, None)
            .expect("Failed to insert knowledge")
    }

    /// Insert a decision.
    pub fn decision(&mut self, id: &str, title: &str) -> Entry {
        self.store
            .insert_decision(id, title, &format!("Decided: {}", title), "Because")
            .expect("Failed to insert decision")
    }

    /// Insert an entry of an arbitrary type.
    pub fn entry_of_type(&mut self, id: &str, entry_type: EntryType) -> Entry {
        self.store
            .insert_entry(id, entry_type, id, "", None, None)
            .expect("Failed to insert entry")
    }

    /// Link two entries with a typed edge.
    pub fn link(&mut self, from: &Entry, to: &Entry, kind: &str) {
        self.store
            .link_entries(&from.entry_id, &to.entry_id, kind)
            .expect("Failed to link entries");
    }

    /// Ids of search results, in result order.
    pub fn search_ids(&self, term: &str) -> Vec<String> {
        self.store
            .search(term)
            .expect("Failed to search")
            .into_iter()
            .map(|e| e.entry_id)
            .collect()
    }

    /// (id, relationship type) pairs reachable from an entry.
    pub fn related_ids(&self, id: &str) -> Vec<(String, String)> {
        self.store
            .related_entries(id)
            .expect("Failed to get related entries")
            .into_iter()
            .map(|(e, kind)| (e.entry_id, kind))
            .collect()
    }

    /// Get all entries count.
    pub fn total_count(&self) -> usize {
        self.store.list(None).expect("Failed to list entries").len()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the StoreError carried by a report.
pub fn store_error(err: &eyre::Report) -> &StoreError {
    err.downcast_ref::<StoreError>()
        .unwrap_or_else(|| panic!("expected a StoreError, got: {:#}", err))
}
