//! Shelf: a local, file-backed knowledge store.
//!
//! Shelf keeps typed entries (knowledge notes, decisions, ...) in a single
//! SQLite file. Entries can be tagged, linked to each other with typed
//! directed relationships, searched by text, and exported as JSON or YAML.
//!
//! A store assumes exclusive write access by one process at a time.
//!
//! # Example
//!
//! ```no_run
//! use shelf::{Store, StoreExportExt, StoreQueryExt};
//! use std::path::Path;
//!
//! // Initialize a new store
//! let mut store = Store::init(Path::new("library.db")).unwrap();
//!
//! // Record knowledge and a decision
//! store.insert_knowledge("K-001", "DLI Routing Pattern", "Three-tier routing", Some(0.95)).unwrap();
//! store.insert_decision("D-001", "Use SQLite", "Chose SQLite over PostgreSQL", "Local-first").unwrap();
//!
//! // Tag and link
//! store.add_tag("K-001", "routing").unwrap();
//! store.link_entries("K-001", "D-001", "implements").unwrap();
//!
//! // Retrieve
//! let hits = store.search("routing").unwrap();
//! assert_eq!(hits[0].entry_id, "K-001");
//! let related = store.related_entries("K-001").unwrap();
//! assert_eq!(related[0].1, "implements");
//!
//! // Export
//! let written = store.export_all(Path::new("library_export.json")).unwrap();
//! assert_eq!(written, 2);
//! ```

mod storage;
mod store;
mod types;

pub mod batch;
pub mod config;
pub mod export;
pub mod id;
pub mod query;

// Re-export public API
pub use batch::{BatchInsertResult, EntrySpec, StoreBatchExt};
pub use config::StoreConfig;
pub use export::{ExportFormat, StoreExportExt, Summary};
pub use id::generate_id;
pub use query::StoreQueryExt;
pub use store::{Store, StoreError};
pub use types::{
    DECISION_CONFIDENCE, DEFAULT_CONFIDENCE, DEFAULT_RELATIONSHIP, Entry, EntryType, Relationship,
    ValidationError,
};
