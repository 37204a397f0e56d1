//! Storage layer for Shelf: a single SQLite file with an in-process schema.

use crate::config::StoreConfig;
use crate::store::StoreError;
use crate::types::{Entry, EntryType, Relationship};
use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result, eyre};
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Layout version recorded in the meta table.
pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Entry table and its required columns, in select order.
const ENTRIES_TABLE: &str = "library_entries";
const ENTRY_COLUMNS: &[&str] = &[
    "entry_id",
    "entry_type",
    "title",
    "content",
    "metadata",
    "confidence",
    "created_at",
    "updated_at",
];

const TAGS_TABLE: &str = "tags";
const TAG_COLUMNS: &[&str] = &["entry_id", "tag"];

const RELATIONSHIPS_TABLE: &str = "entry_relationships";
const RELATIONSHIP_COLUMNS: &[&str] = &["from_entry_id", "to_entry_id", "relationship_type", "created_at"];

const META_TABLE: &str = "meta";
const META_COLUMNS: &[&str] = &["key", "value"];

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS library_entries (
        entry_id TEXT PRIMARY KEY,
        entry_type TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT,
        confidence REAL NOT NULL CHECK (confidence BETWEEN 0.0 AND 1.0),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_entries_type ON library_entries(entry_type);
    CREATE INDEX IF NOT EXISTS idx_entries_created ON library_entries(created_at);

    CREATE TABLE IF NOT EXISTS tags (
        entry_id TEXT NOT NULL REFERENCES library_entries(entry_id),
        tag TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tags_entry ON tags(entry_id);
    CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);

    CREATE TABLE IF NOT EXISTS entry_relationships (
        from_entry_id TEXT NOT NULL REFERENCES library_entries(entry_id),
        to_entry_id TEXT NOT NULL REFERENCES library_entries(entry_id),
        relationship_type TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (from_entry_id, to_entry_id, relationship_type)
    );
    CREATE INDEX IF NOT EXISTS idx_relationships_from ON entry_relationships(from_entry_id);
    CREATE INDEX IF NOT EXISTS idx_relationships_to ON entry_relationships(to_entry_id);

    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

const SELECT_ENTRY: &str = r#"
    SELECT entry_id, entry_type, title, content, metadata, confidence, created_at, updated_at
    FROM library_entries
"#;

/// Storage handle for reading/writing the store file.
pub struct Storage {
    path: PathBuf,
    db: Connection,
}

impl Storage {
    /// Create the backing file if needed and bootstrap the schema.
    pub fn init(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create store directory")?;
        }
        Self::connect(config, true)
    }

    /// Open a store file that has already been initialized.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if !config.path.exists() {
            return Err(eyre!(StoreError::SchemaNotFound(config.path.clone())));
        }
        Self::connect(config, false)
    }

    fn connect(config: &StoreConfig, create: bool) -> Result<Self> {
        let db = Connection::open(&config.path)
            .map_err(|e| initialization_error("Failed to open SQLite database", e))?;

        let storage = Self {
            path: config.path.clone(),
            db,
        };

        storage.bootstrap(config, create).map_err(|e| {
            if e.downcast_ref::<StoreError>().is_some() {
                e
            } else {
                initialization_error("Failed to bootstrap store", format!("{:#}", e))
            }
        })?;

        info!("Store ready at {}", storage.path.display());
        Ok(storage)
    }

    /// Verify any existing layout, then configure the connection and apply the schema.
    fn bootstrap(&self, config: &StoreConfig, create: bool) -> Result<()> {
        self.db
            .busy_timeout(config.busy_timeout)
            .context("Failed to set busy timeout")?;

        let tables = [
            (ENTRIES_TABLE, ENTRY_COLUMNS),
            (TAGS_TABLE, TAG_COLUMNS),
            (RELATIONSHIPS_TABLE, RELATIONSHIP_COLUMNS),
            (META_TABLE, META_COLUMNS),
        ];

        let mut present = 0;
        let mut has_meta = false;
        for (table, required) in tables {
            let columns = self.table_columns(table)?;
            if columns.is_empty() {
                continue;
            }
            present += 1;
            has_meta |= table == META_TABLE;
            if let Some(missing) = required.iter().find(|c| !columns.iter().any(|have| have == *c)) {
                return Err(eyre!(StoreError::Initialization(format!(
                    "table {} is missing column {}",
                    table, missing
                ))));
            }
        }

        if !create && present == 0 {
            return Err(eyre!(StoreError::SchemaNotFound(self.path.clone())));
        }

        if has_meta {
            let version: Option<String> = self
                .db
                .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
                .optional()
                .context("Failed to read schema version")?;
            if let Some(version) = version
                && version != SCHEMA_VERSION.to_string()
            {
                return Err(eyre!(StoreError::Initialization(format!(
                    "unsupported schema version {} (expected {})",
                    version, SCHEMA_VERSION
                ))));
            }
        }

        // The file is accepted; only now may it be changed
        self.db
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        if config.wal {
            let mode: String = self
                .db
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .context("Failed to enable write-ahead logging")?;
            debug!("journal_mode = {}", mode);
        }

        self.db.execute_batch(SCHEMA).context("Failed to apply schema")?;

        self.db
            .execute(
                "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?)",
                params![SCHEMA_VERSION.to_string()],
            )
            .context("Failed to record schema version")?;

        Ok(())
    }

    /// Column names of a table, empty if the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.db.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new entry. Fails if the id is taken.
    pub fn insert_entry(&mut self, entry: &Entry) -> Result<()> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize metadata")?;

        let tx = self.db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if entry_exists_in(&tx, &entry.entry_id)? {
            return Err(eyre!(StoreError::DuplicateEntry(entry.entry_id.clone())));
        }

        tx.execute(
            r#"
            INSERT INTO library_entries (entry_id, entry_type, title, content, metadata, confidence, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.entry_id,
                entry.entry_type.as_str(),
                entry.title,
                entry.content,
                metadata,
                entry.confidence,
                format_timestamp(&entry.created_at),
                format_timestamp(&entry.updated_at),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                eyre!(StoreError::DuplicateEntry(entry.entry_id.clone()))
            } else {
                eyre::Report::new(e).wrap_err("Failed to insert entry")
            }
        })?;

        tx.commit().context("Failed to commit entry")?;
        Ok(())
    }

    /// Attach a tag to an existing entry.
    pub fn insert_tag(&mut self, entry_id: &str, tag: &str) -> Result<()> {
        let tx = self.db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !entry_exists_in(&tx, entry_id)? {
            return Err(eyre!(StoreError::UnknownEntry(entry_id.to_string())));
        }

        tx.execute("INSERT INTO tags (entry_id, tag) VALUES (?, ?)", params![entry_id, tag])
            .context("Failed to insert tag")?;

        tx.commit().context("Failed to commit tag")?;
        Ok(())
    }

    /// Insert a relationship between two existing entries.
    ///
    /// Returns the stored edge: an identical edge that already exists is
    /// returned unchanged instead of being written again.
    pub fn insert_relationship(&mut self, relationship: &Relationship) -> Result<Relationship> {
        let tx = self.db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in [&relationship.from_entry_id, &relationship.to_entry_id] {
            if !entry_exists_in(&tx, id)? {
                return Err(eyre!(StoreError::UnknownEntry(id.clone())));
            }
        }

        let existing = tx
            .query_row(
                r#"
                SELECT from_entry_id, to_entry_id, relationship_type, created_at
                FROM entry_relationships
                WHERE from_entry_id = ? AND to_entry_id = ? AND relationship_type = ?
                "#,
                params![
                    relationship.from_entry_id,
                    relationship.to_entry_id,
                    relationship.relationship_type
                ],
                Self::row_to_relationship,
            )
            .optional()?;

        if let Some(existing) = existing {
            debug!(
                "Relationship {} -[{}]-> {} already present",
                existing.from_entry_id, existing.relationship_type, existing.to_entry_id
            );
            return Ok(existing);
        }

        tx.execute(
            r#"
            INSERT INTO entry_relationships (from_entry_id, to_entry_id, relationship_type, created_at)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                relationship.from_entry_id,
                relationship.to_entry_id,
                relationship.relationship_type,
                format_timestamp(&relationship.created_at),
            ],
        )
        .context("Failed to insert relationship")?;

        tx.commit().context("Failed to commit relationship")?;
        Ok(relationship.clone())
    }

    /// Check whether an entry exists.
    pub fn entry_exists(&self, entry_id: &str) -> Result<bool> {
        entry_exists_in(&self.db, entry_id)
    }

    /// Get an entry by id.
    pub fn get_entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        let sql = format!("{} WHERE entry_id = ?", SELECT_ENTRY);
        let entry = self
            .db
            .query_row(&sql, params![entry_id], Self::row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// List entries, oldest first, optionally restricted to one type.
    pub fn list_entries(&self, entry_type: Option<&EntryType>) -> Result<Vec<Entry>> {
        let entries = match entry_type {
            Some(kind) => {
                let sql = format!("{} WHERE entry_type = ? ORDER BY created_at ASC, rowid ASC", SELECT_ENTRY);
                let mut stmt = self.db.prepare(&sql)?;
                stmt.query_map(params![kind.as_str()], Self::row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!("{} ORDER BY created_at ASC, rowid ASC", SELECT_ENTRY);
                let mut stmt = self.db.prepare(&sql)?;
                stmt.query_map([], Self::row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(entries)
    }

    /// Tags on an entry, in the order they were added.
    pub fn tags_for(&self, entry_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .prepare("SELECT tag FROM tags WHERE entry_id = ? ORDER BY rowid ASC")?;
        let tags = stmt
            .query_map(params![entry_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    /// Outgoing edges of an entry, in creation order.
    pub fn relationships_from(&self, entry_id: &str) -> Result<Vec<Relationship>> {
        let mut stmt = self.db.prepare(
            r#"
            SELECT from_entry_id, to_entry_id, relationship_type, created_at
            FROM entry_relationships
            WHERE from_entry_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;
        let edges = stmt
            .query_map(params![entry_id], Self::row_to_relationship)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Entries whose title or content contains `term`, newest first.
    pub fn search_entries(&self, term: &str) -> Result<Vec<Entry>> {
        let sql = format!(
            r#"{}
            WHERE title LIKE ?1 ESCAPE '\' OR content LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, rowid DESC"#,
            SELECT_ENTRY
        );
        let mut stmt = self.db.prepare(&sql)?;
        let entries = stmt
            .query_map(params![like_pattern(term)], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entries one outgoing edge away, paired with the edge type, in edge creation order.
    pub fn related_entries(&self, entry_id: &str) -> Result<Vec<(Entry, String)>> {
        let mut stmt = self.db.prepare(
            r#"
            SELECT e.entry_id, e.entry_type, e.title, e.content, e.metadata, e.confidence,
                   e.created_at, e.updated_at, r.relationship_type
            FROM entry_relationships r
            JOIN library_entries e ON r.to_entry_id = e.entry_id
            WHERE r.from_entry_id = ?
            ORDER BY r.created_at ASC, r.rowid ASC
            "#,
        )?;
        let related = stmt
            .query_map(params![entry_id], |row| {
                let entry = Self::row_to_entry(row)?;
                let kind: String = row.get(8)?;
                Ok((entry, kind))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(related)
    }

    /// Entries carrying a tag, newest first.
    pub fn entries_tagged(&self, tag: &str) -> Result<Vec<Entry>> {
        let sql = format!(
            r#"{}
            WHERE EXISTS (
                SELECT 1 FROM tags t
                WHERE t.entry_id = library_entries.entry_id AND t.tag = ?
            )
            ORDER BY created_at DESC, rowid DESC"#,
            SELECT_ENTRY
        );
        let mut stmt = self.db.prepare(&sql)?;
        let entries = stmt
            .query_map(params![tag], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entry counts grouped by type.
    pub fn counts_by_type(&self) -> Result<HashMap<String, usize>> {
        let mut stmt = self
            .db
            .prepare("SELECT entry_type, COUNT(*) FROM library_entries GROUP BY entry_type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(|(kind, count)| (kind, count as usize)).collect())
    }

    /// Row counts of the three entity tables: (entries, tags, relationships).
    pub fn row_counts(&self) -> Result<(usize, usize, usize)> {
        let (entries, tags, relationships): (i64, i64, i64) = self.db.query_row(
            r#"
            SELECT (SELECT COUNT(*) FROM library_entries),
                   (SELECT COUNT(*) FROM tags),
                   (SELECT COUNT(*) FROM entry_relationships)
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok((entries as usize, tags as usize, relationships as usize))
    }

    /// Convert a database row to an Entry.
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
        let entry_type: String = row.get(1)?;
        let entry_type = entry_type
            .parse::<EntryType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let metadata: Option<String> = row.get(4)?;
        let metadata = metadata
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(Entry {
            entry_id: row.get(0)?,
            entry_type,
            title: row.get(2)?,
            content: row.get(3)?,
            metadata,
            confidence: row.get(5)?,
            created_at: parse_timestamp(row, 6)?,
            updated_at: parse_timestamp(row, 7)?,
        })
    }

    /// Convert a database row to a Relationship.
    fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<Relationship> {
        Ok(Relationship {
            from_entry_id: row.get(0)?,
            to_entry_id: row.get(1)?,
            relationship_type: row.get(2)?,
            created_at: parse_timestamp(row, 3)?,
        })
    }
}

fn entry_exists_in(db: &Connection, entry_id: &str) -> Result<bool> {
    let count: i64 = db.query_row(
        "SELECT COUNT(*) FROM library_entries WHERE entry_id = ?",
        params![entry_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn initialization_error(context: &str, err: impl std::fmt::Display) -> eyre::Report {
    eyre!(StoreError::Initialization(format!("{}: {}", context, err)))
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Build a LIKE pattern matching `term` literally anywhere in the text.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
