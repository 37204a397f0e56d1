//! CLI argument parsing for Shelf.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "A local, file-backed knowledge and decision store",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/shelf/logs/shelf.log"
)]
pub struct Cli {
    /// Path to the store file (required; no default location)
    #[arg(short = 'd', long, global = true, env = "SHELF_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create (or verify) the store file
    Init,

    /// Add an entry
    Add {
        /// Entry title
        title: String,

        /// Entry id (generated from the type prefix when omitted)
        #[arg(short, long)]
        id: Option<String>,

        /// Entry type (knowledge, decision, pattern, achievement, ...)
        #[arg(short = 't', long = "type", default_value = "knowledge")]
        entry_type: String,

        /// Entry body
        #[arg(short, long, default_value = "")]
        content: String,

        /// Confidence in [0.0, 1.0] (default depends on type)
        #[arg(short = 'C', long)]
        confidence: Option<f64>,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,

        /// Tags (comma-separated)
        #[arg(short = 'g', long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Record a decision with its rationale
    Decide {
        /// Decision title
        title: String,

        /// Why the decision was made
        #[arg(short, long)]
        rationale: String,

        /// Entry id (generated when omitted)
        #[arg(short, long)]
        id: Option<String>,

        /// Decision body
        #[arg(short, long, default_value = "")]
        content: String,

        /// Tags (comma-separated)
        #[arg(short = 'g', long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Tag an entry
    Tag {
        /// Entry id
        id: String,

        /// Tags to add
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Link one entry to another
    Link {
        /// Source entry id
        from_id: String,

        /// Target entry id
        to_id: String,

        /// Relationship type
        #[arg(short, long, default_value = "relates_to")]
        kind: String,
    },

    /// Show an entry with its tags and outgoing links
    Show {
        /// Entry id
        id: String,
    },

    /// List entries
    List {
        /// Filter by entry type
        #[arg(short = 't', long = "type")]
        entry_type: Option<String>,
    },

    /// Search titles and content
    Search {
        /// Text to look for (empty matches everything)
        #[arg(default_value = "")]
        term: String,
    },

    /// Show entries linked from an entry
    Related {
        /// Entry id
        id: String,
    },

    /// Show entries carrying a tag
    Tagged {
        /// Tag
        tag: String,
    },

    /// Export all entries to a JSON or YAML file
    Export {
        /// Destination file (format from extension unless --format is given)
        destination: PathBuf,

        /// Output format (json, yaml)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show entry counts by type
    Stats,
}
