//! Batch operations for bulk inserts.
//!
//! Each entry in a batch is committed on its own; a failing entry is recorded
//! and the rest of the batch still runs.

use crate::store::Store;
use crate::types::{Entry, EntryType};
use eyre::Result;
use log::warn;
use serde_json::Value;

/// Specification for inserting an entry in a batch.
#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub entry_id: String,
    pub entry_type: EntryType,
    pub title: String,
    pub content: String,
    pub metadata: Option<Value>,
    pub confidence: Option<f64>,
    pub tags: Vec<String>,
}

impl EntrySpec {
    /// Create a new spec with an id, type and title.
    pub fn new(entry_id: impl Into<String>, entry_type: EntryType, title: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            entry_type,
            title: title.into(),
            content: String::new(),
            metadata: None,
            confidence: None,
            tags: Vec::new(),
        }
    }

    /// Set the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the metadata document.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the tags to add after the entry is inserted.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(|t| t.into()).collect();
        self
    }
}

/// Result of a batch insert.
#[derive(Debug)]
pub struct BatchInsertResult {
    /// Successfully inserted entries.
    pub inserted: Vec<Entry>,
    /// Errors that occurred (index, error message).
    pub errors: Vec<(usize, String)>,
}

/// Extension trait for batch operations on Store.
pub trait StoreBatchExt {
    /// Insert multiple entries, then their tags, one commit per write.
    fn batch_insert(&mut self, specs: Vec<EntrySpec>) -> Result<BatchInsertResult>;
}

impl StoreBatchExt for Store {
    fn batch_insert(&mut self, specs: Vec<EntrySpec>) -> Result<BatchInsertResult> {
        let mut inserted = Vec::new();
        let mut errors = Vec::new();

        for (i, spec) in specs.into_iter().enumerate() {
            let entry = match self.insert_entry(
                &spec.entry_id,
                spec.entry_type,
                &spec.title,
                &spec.content,
                spec.metadata,
                spec.confidence,
            ) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Batch entry {} ({}) rejected: {:#}", i, spec.entry_id, e);
                    errors.push((i, e.to_string()));
                    continue;
                }
            };

            // An entry stays inserted even if one of its tags is rejected
            for tag in &spec.tags {
                if let Err(e) = self.add_tag(&entry.entry_id, tag) {
                    warn!("Batch entry {} tag '{}' rejected: {:#}", i, tag, e);
                    errors.push((i, e.to_string()));
                }
            }

            inserted.push(entry);
        }

        Ok(BatchInsertResult { inserted, errors })
    }
}
