//! Shelf CLI - a local, file-backed knowledge and decision store.

use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use serde_json::Value;
use shelf::{
    Entry, EntryType, ExportFormat, Store, StoreError, StoreExportExt, StoreQueryExt, generate_id,
};
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("shelf.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_path(cli: &Cli) -> Result<PathBuf> {
    cli.db
        .clone()
        .ok_or_else(|| eyre!("No store path given. Pass --db <path> or set SHELF_DB."))
}

fn parse_entry_type(raw: &str) -> Result<EntryType> {
    raw.parse::<EntryType>()
        .map_err(|e| eyre!(StoreError::InvalidValue(e)))
}

fn format_entry_type(entry_type: &EntryType) -> ColoredString {
    match entry_type {
        EntryType::Knowledge => "knowledge".green(),
        EntryType::Decision => "decision".yellow(),
        EntryType::Pattern => "pattern".magenta(),
        EntryType::Achievement => "achievement".blue(),
        EntryType::Other(kind) => kind.as_str().normal(),
    }
}

fn print_entry_line(entry: &Entry) {
    println!(
        "{} {} {} {}",
        format_entry_type(&entry.entry_type),
        entry.entry_id.cyan(),
        entry.title,
        format!("({:.2})", entry.confidence).dimmed()
    );
}

fn add_tags(store: &mut Store, id: &str, tags: Option<Vec<String>>) -> Result<()> {
    for tag in tags.unwrap_or_default() {
        store.add_tag(id, &tag).context("Failed to tag entry")?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let store_path = get_store_path(&cli)?;

    match cli.command {
        Command::Init => {
            Store::init(&store_path).context("Failed to initialize store")?;
            println!("{} Initialized store at {}", "✓".green(), store_path.display());
        }

        Command::Add {
            title,
            id,
            entry_type,
            content,
            confidence,
            metadata,
            tags,
        } => {
            let mut store = Store::open(&store_path).context("Failed to open store")?;
            let entry_type = parse_entry_type(&entry_type)?;
            let metadata = metadata
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("Failed to parse --metadata as JSON")?;
            let id = id.unwrap_or_else(|| generate_id(&entry_type, &title, Utc::now()));

            let entry = store
                .insert_entry(&id, entry_type, &title, &content, metadata, confidence)
                .context("Failed to add entry")?;
            add_tags(&mut store, &entry.entry_id, tags)?;

            println!("{} Added: {} {}", "✓".green(), entry.entry_id.cyan(), entry.title);
        }

        Command::Decide {
            title,
            rationale,
            id,
            content,
            tags,
        } => {
            let mut store = Store::open(&store_path).context("Failed to open store")?;
            let id = id.unwrap_or_else(|| generate_id(&EntryType::Decision, &title, Utc::now()));

            let entry = store
                .insert_decision(&id, &title, &content, &rationale)
                .context("Failed to record decision")?;
            add_tags(&mut store, &entry.entry_id, tags)?;

            println!("{} Decided: {} {}", "✓".green(), entry.entry_id.cyan(), entry.title);
        }

        Command::Tag { id, tags } => {
            let mut store = Store::open(&store_path).context("Failed to open store")?;
            add_tags(&mut store, &id, Some(tags.clone()))?;

            println!("{} Tagged {} with: {}", "✓".green(), id.cyan(), tags.join(", "));
        }

        Command::Link { from_id, to_id, kind } => {
            let mut store = Store::open(&store_path).context("Failed to open store")?;
            store
                .link_entries(&from_id, &to_id, &kind)
                .context("Failed to link entries")?;

            println!("{} Linked {} → {} ({})", "✓".green(), from_id.cyan(), to_id.cyan(), kind);
        }

        Command::Show { id } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let entry = store.get(&id).context("Failed to get entry")?;

            match entry {
                Some(entry) => {
                    println!("{}: {}", "ID".bold(), entry.entry_id.cyan());
                    println!("{}: {}", "Type".bold(), format_entry_type(&entry.entry_type));
                    println!("{}: {}", "Title".bold(), entry.title);
                    println!("{}: {:.2}", "Confidence".bold(), entry.confidence);
                    if !entry.content.is_empty() {
                        println!("{}: {}", "Content".bold(), entry.content);
                    }
                    if let Some(metadata) = &entry.metadata {
                        println!("{}: {}", "Metadata".bold(), metadata);
                    }
                    let tags = store.tags(&entry.entry_id).context("Failed to get tags")?;
                    if !tags.is_empty() {
                        println!("{}: {}", "Tags".bold(), tags.join(", "));
                    }
                    for edge in store
                        .relationships_from(&entry.entry_id)
                        .context("Failed to get relationships")?
                    {
                        println!("{}: {} → {}", "Link".bold(), edge.relationship_type, edge.to_entry_id.cyan());
                    }
                    println!("{}: {}", "Created".bold(), entry.created_at);
                    println!("{}: {}", "Updated".bold(), entry.updated_at);
                }
                None => {
                    eprintln!("{} Entry not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::List { entry_type } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let entry_type = entry_type.as_deref().map(parse_entry_type).transpose()?;

            let entries = store.list(entry_type.as_ref()).context("Failed to list entries")?;

            if entries.is_empty() {
                println!("{}", "No entries found".dimmed());
            } else {
                for entry in &entries {
                    print_entry_line(entry);
                }
            }
        }

        Command::Search { term } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let entries = store.search(&term).context("Failed to search entries")?;

            if entries.is_empty() {
                println!("{} No entries match '{}'", "∅".dimmed(), term);
            } else {
                println!("{} {} result(s) for '{}':", "→".blue(), entries.len(), term);
                for entry in &entries {
                    print_entry_line(entry);
                    let preview: String = entry.content.chars().take(100).collect();
                    if !preview.is_empty() {
                        println!("    {}", preview.dimmed());
                    }
                }
            }
        }

        Command::Related { id } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let related = store.related_entries(&id).context("Failed to get related entries")?;

            if related.is_empty() {
                println!("{}", "No related entries".dimmed());
            } else {
                println!("{} Entries related to {}:", "→".blue(), id.cyan());
                for (entry, kind) in &related {
                    println!(
                        "  {} {} {} {}",
                        format_entry_type(&entry.entry_type),
                        entry.entry_id.cyan(),
                        entry.title,
                        format!("({})", kind).dimmed()
                    );
                }
            }
        }

        Command::Tagged { tag } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let entries = store.tagged(&tag).context("Failed to get tagged entries")?;

            if entries.is_empty() {
                println!("{}", "No tagged entries".dimmed());
            } else {
                for entry in &entries {
                    print_entry_line(entry);
                }
            }
        }

        Command::Export { destination, format } => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let format = match format {
                Some(raw) => raw.parse::<ExportFormat>().map_err(|e| eyre!(e))?,
                None => ExportFormat::from_path(&destination),
            };

            let count = store
                .export_all_as(&destination, format)
                .context("Failed to export entries")?;

            println!("{} Exported {} entries to {}", "✓".green(), count, destination.display());
        }

        Command::Stats => {
            let store = Store::open(&store_path).context("Failed to open store")?;
            let summary = store.summary().context("Failed to compute statistics")?;

            println!(
                "{} {} entries, {} tags, {} relationships",
                "Σ".blue(),
                summary.entries,
                summary.tags,
                summary.relationships
            );
            let mut by_type: Vec<_> = summary.by_type.into_iter().collect();
            by_type.sort();
            for (entry_type, count) in by_type {
                println!("  {}: {}", entry_type, count);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
