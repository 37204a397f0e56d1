//! High-level store API for Shelf.

use crate::config::StoreConfig;
use crate::storage::Storage;
use crate::types::{
    DEFAULT_RELATIONSHIP, Entry, EntryType, Relationship, ValidationError, validate_entry_id,
    validate_relationship_type, validate_tag,
};
use chrono::{DateTime, SubsecRound, Utc};
use eyre::{Context, Result};
use log::debug;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// The store file does not exist or carries none of the store's tables.
    SchemaNotFound(PathBuf),
    /// The store file could not be opened or bootstrapped.
    Initialization(String),
    /// An entry with this id already exists.
    DuplicateEntry(String),
    /// A tag or link refers to an entry that does not exist.
    UnknownEntry(String),
    /// A value was rejected before anything was written.
    InvalidValue(ValidationError),
    /// Reading or writing a file outside the database failed.
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::SchemaNotFound(path) => {
                write!(f, "no store schema found at {}; initialize the store first", path.display())
            }
            StoreError::Initialization(msg) => write!(f, "failed to initialize store: {}", msg),
            StoreError::DuplicateEntry(id) => write!(f, "entry already exists: {}", id),
            StoreError::UnknownEntry(id) => write!(f, "entry not found: {}", id),
            StoreError::InvalidValue(e) => write!(f, "invalid value: {}", e),
            StoreError::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Current time at the precision the store persists.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The main Shelf store.
///
/// A store assumes its process is the only writer to the backing file.
pub struct Store {
    storage: Storage,
}

impl Store {
    /// Initialize (or reopen) a store at the given file path.
    pub fn init(path: &Path) -> Result<Self> {
        Self::init_with(&StoreConfig::new(path))
    }

    /// Initialize (or reopen) a store with explicit configuration.
    pub fn init_with(config: &StoreConfig) -> Result<Self> {
        let storage = Storage::init(config)?;
        Ok(Self { storage })
    }

    /// Open an existing store.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(&StoreConfig::new(path))
    }

    /// Open an existing store with explicit configuration.
    pub fn open_with(config: &StoreConfig) -> Result<Self> {
        let storage = Storage::open(config)?;
        Ok(Self { storage })
    }

    /// Access the storage layer.
    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Insert a new entry.
    ///
    /// `confidence` defaults by type: 1.0 for decisions, 0.9 otherwise.
    pub fn insert_entry(
        &mut self,
        entry_id: &str,
        entry_type: EntryType,
        title: &str,
        content: &str,
        metadata: Option<Value>,
        confidence: Option<f64>,
    ) -> Result<Entry> {
        let now = now();
        let confidence = confidence.unwrap_or_else(|| entry_type.default_confidence());

        let entry = Entry {
            entry_id: entry_id.to_string(),
            entry_type,
            title: title.to_string(),
            content: content.to_string(),
            metadata,
            confidence,
            created_at: now,
            updated_at: now,
        };

        // Validate before persisting
        entry.validate().map_err(|e| eyre::eyre!(StoreError::InvalidValue(e)))?;

        self.storage.insert_entry(&entry).context("Failed to persist entry")?;

        debug!("Inserted {} entry {}", entry.entry_type, entry.entry_id);
        Ok(entry)
    }

    /// Insert a knowledge entry.
    pub fn insert_knowledge(
        &mut self,
        entry_id: &str,
        title: &str,
        content: &str,
        confidence: Option<f64>,
    ) -> Result<Entry> {
        self.insert_entry(entry_id, EntryType::Knowledge, title, content, None, confidence)
    }

    /// Insert a decision, recording its rationale as metadata.
    pub fn insert_decision(&mut self, entry_id: &str, title: &str, content: &str, rationale: &str) -> Result<Entry> {
        let metadata = json!({ "rationale": rationale });
        self.insert_entry(entry_id, EntryType::Decision, title, content, Some(metadata), None)
    }

    /// Get an entry by id.
    pub fn get(&self, entry_id: &str) -> Result<Option<Entry>> {
        self.storage.get_entry(entry_id)
    }

    /// Check whether an entry exists.
    pub fn exists(&self, entry_id: &str) -> Result<bool> {
        self.storage.entry_exists(entry_id)
    }

    /// List entries oldest first, optionally restricted to one type.
    pub fn list(&self, entry_type: Option<&EntryType>) -> Result<Vec<Entry>> {
        self.storage.list_entries(entry_type)
    }

    /// Attach a tag to an entry. The same tag may be added more than once.
    pub fn add_tag(&mut self, entry_id: &str, tag: &str) -> Result<()> {
        validate_tag(tag).map_err(|e| eyre::eyre!(StoreError::InvalidValue(e)))?;

        self.storage.insert_tag(entry_id, tag).context("Failed to persist tag")?;

        debug!("Tagged {} with {}", entry_id, tag);
        Ok(())
    }

    /// Tags on an entry, in the order they were added.
    pub fn tags(&self, entry_id: &str) -> Result<Vec<String>> {
        self.storage.tags_for(entry_id)
    }

    /// Link two entries with a `relates_to` edge.
    pub fn link(&mut self, from_id: &str, to_id: &str) -> Result<Relationship> {
        self.link_entries(from_id, to_id, DEFAULT_RELATIONSHIP)
    }

    /// Create a directed, typed edge from one entry to another.
    ///
    /// Linking the same pair with the same type again returns the existing edge.
    pub fn link_entries(&mut self, from_id: &str, to_id: &str, relationship_type: &str) -> Result<Relationship> {
        validate_relationship_type(relationship_type).map_err(|e| eyre::eyre!(StoreError::InvalidValue(e)))?;
        validate_entry_id(from_id).map_err(|e| eyre::eyre!(StoreError::InvalidValue(e)))?;
        validate_entry_id(to_id).map_err(|e| eyre::eyre!(StoreError::InvalidValue(e)))?;

        // No self-referential edges
        if from_id == to_id {
            return Err(eyre::eyre!(StoreError::InvalidValue(
                ValidationError::SelfReferentialLink(from_id.to_string())
            )));
        }

        let relationship = Relationship {
            from_entry_id: from_id.to_string(),
            to_entry_id: to_id.to_string(),
            relationship_type: relationship_type.to_string(),
            created_at: now(),
        };

        let stored = self
            .storage
            .insert_relationship(&relationship)
            .context("Failed to persist relationship")?;

        debug!("Linked {} -[{}]-> {}", from_id, relationship_type, to_id);
        Ok(stored)
    }

    /// Outgoing edges of an entry, in creation order.
    pub fn relationships_from(&self, entry_id: &str) -> Result<Vec<Relationship>> {
        self.storage.relationships_from(entry_id)
    }
}
