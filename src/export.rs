//! Snapshot export and aggregate reporting.
//!
//! Exports are written to a sibling temporary file and renamed over the
//! destination only once fully flushed, so a reader never finds a truncated
//! export at the destination path.

use crate::store::{Store, StoreError};
use crate::types::Entry;
use eyre::{Result, eyre};
use log::info;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Structured text formats an export can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Pretty-printed JSON array of objects
    #[default]
    Json,
    /// YAML sequence of mappings
    Yaml,
}

impl ExportFormat {
    /// Pick a format from a destination's extension (`.yaml`/`.yml`, else JSON).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => ExportFormat::Yaml,
            _ => ExportFormat::Json,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(format!("unknown export format '{}': expected json or yaml", other)),
        }
    }
}

/// Totals across the whole store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Number of entries.
    pub entries: usize,
    /// Number of tag rows (duplicates included).
    pub tags: usize,
    /// Number of relationships.
    pub relationships: usize,
    /// Entry counts keyed by entry type.
    pub by_type: HashMap<String, usize>,
}

/// Extension trait for export and reporting on Store.
pub trait StoreExportExt {
    /// Write every entry to `destination`, format chosen by extension.
    /// Returns the number of entries written.
    fn export_all(&self, destination: &Path) -> Result<usize>;

    /// Write every entry to `destination` in the given format.
    fn export_all_as(&self, destination: &Path, format: ExportFormat) -> Result<usize>;

    /// Entry counts grouped by entry type.
    fn counts_by_type(&self) -> Result<HashMap<String, usize>>;

    /// Entry, tag and relationship totals.
    fn summary(&self) -> Result<Summary>;
}

impl StoreExportExt for Store {
    fn export_all(&self, destination: &Path) -> Result<usize> {
        self.export_all_as(destination, ExportFormat::from_path(destination))
    }

    fn export_all_as(&self, destination: &Path, format: ExportFormat) -> Result<usize> {
        let entries = self.list(None)?;
        let tmp_path = temp_path_for(destination)?;

        if let Err(e) = write_snapshot(&tmp_path, &entries, format) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, destination) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(&format!("Failed to move export into {}", destination.display()), e));
        }

        info!(
            "Exported {} entries to {} ({:?})",
            entries.len(),
            destination.display(),
            format
        );
        Ok(entries.len())
    }

    fn counts_by_type(&self) -> Result<HashMap<String, usize>> {
        self.storage().counts_by_type()
    }

    fn summary(&self) -> Result<Summary> {
        let (entries, tags, relationships) = self.storage().row_counts()?;
        Ok(Summary {
            entries,
            tags,
            relationships,
            by_type: self.counts_by_type()?,
        })
    }
}

/// Hidden sibling of the destination, so the final rename stays on one filesystem.
fn temp_path_for(destination: &Path) -> Result<PathBuf> {
    let file_name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!(StoreError::Io(format!("invalid export path: {}", destination.display()))))?;
    Ok(destination.with_file_name(format!(".{}.tmp", file_name)))
}

fn write_snapshot(path: &Path, entries: &[Entry], format: ExportFormat) -> Result<()> {
    let file = File::create(path).map_err(|e| io_error(&format!("Failed to create {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Json => serde_json::to_writer_pretty(&mut writer, entries)
            .map_err(|e| io_error("Failed to serialize entries as JSON", e))?,
        ExportFormat::Yaml => serde_yaml::to_writer(&mut writer, entries)
            .map_err(|e| io_error("Failed to serialize entries as YAML", e))?,
    }

    writeln!(writer).map_err(|e| io_error("Failed to write export", e))?;
    writer.flush().map_err(|e| io_error("Failed to flush export", e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| io_error("Failed to sync export", e))?;

    Ok(())
}

fn io_error(context: &str, err: impl std::fmt::Display) -> eyre::Report {
    eyre!(StoreError::Io(format!("{}: {}", context, err)))
}
