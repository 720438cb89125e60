//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// acf-porter: export, preview and import custom-field data as JSON
#[derive(Parser, Debug)]
#[command(name = "acfp", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.acfporter/data/fields.db)
    #[arg(long, global = true, env = "ACFP_DB")]
    pub db: Option<PathBuf>,

    /// Backup directory (default: ~/.acfporter/backups)
    #[arg(long, global = true, env = "ACFP_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Actor name for audit trail and access checks
    #[arg(long, global = true, env = "ACFP_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the field database and backup directory
    Init {
        /// Recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Content item management
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Read and write individual fields
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Export an item's fields as JSON
    Export(ExportArgs),

    /// Import a JSON payload into an item's fields
    Import(ImportArgs),

    /// Show what an import would change, without writing
    Preview(PreviewArgs),

    /// List and restore pre-import backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Item Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create a content item
    Create {
        /// Item title
        title: String,

        /// Type tag (page, post, ...)
        #[arg(long = "type", default_value = "page")]
        type_tag: String,
    },

    /// List content items
    List {
        /// Only items with this type tag
        #[arg(long = "type")]
        type_tag: Option<String>,
    },

    /// Show an item with its fields and recent history
    Show {
        /// Item ID
        id: i64,
    },
}

// ============================================================================
// Field Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FieldCommands {
    /// Set a field to a JSON value
    Set {
        /// Item ID
        item: i64,

        /// Field key
        key: String,

        /// JSON value (quote strings: '"text"')
        value: String,
    },

    /// Get one field, or all fields of an item
    Get {
        /// Item ID
        item: i64,

        /// Field key (omit for all fields)
        key: Option<String>,
    },

    /// Delete a field
    Delete {
        /// Item ID
        item: i64,

        /// Field key
        key: String,
    },
}

// ============================================================================
// Transfer Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Item ID
    pub item: i64,

    /// Output file (default: ./acf-export-<slug>.json)
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the JSON document to stdout
    #[arg(long)]
    pub stdout: bool,
}

/// Payload sources shared by import and preview.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// JSON file to read
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Inline JSON text (`-` reads stdin). Takes precedence over --file.
    #[arg(long)]
    pub inline: Option<String>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Item ID
    pub item: i64,

    #[command(flatten)]
    pub payload: PayloadArgs,

    /// Back up current fields before importing
    #[arg(long)]
    pub backup: bool,

    /// Refuse the import unless current fields match this fingerprint
    #[arg(long, value_name = "FINGERPRINT")]
    pub expect: Option<String>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Item ID
    pub item: i64,

    #[command(flatten)]
    pub payload: PayloadArgs,
}

// ============================================================================
// Backup Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// List backups, newest first
    List {
        /// Only backups of this item
        #[arg(long)]
        item: Option<i64>,
    },

    /// Re-import a backup into the item it was taken from
    Restore {
        /// Backup file path
        path: PathBuf,

        /// Back up current fields before restoring
        #[arg(long)]
        backup: bool,
    },
}
