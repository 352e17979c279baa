//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Finesight - Personal finance tracking backend
#[derive(Parser)]
#[command(name = "finesight")]
#[command(about = "Self-hosted personal finance backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, env = "FINESIGHT_DB", default_value = "finesight.db", global = true)]
    pub db: PathBuf,

    /// Storage backend
    #[arg(long, env = "FINESIGHT_STORAGE", value_enum, default_value_t = StorageKind::Sqlite, global = true)]
    pub storage: StorageKind,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set FINESIGHT_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// SQLite file at --db
    Sqlite,
    /// Process memory; everything is lost on exit
    Memory,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3001")]
        port: u16,

        /// Host to bind to
        #[arg(long, env = "FINESIGHT_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Do not run the daily recurring job (also FINESIGHT_RECURRING=off)
        #[arg(long)]
        no_recurring: bool,
    },

    /// Recurring transaction commands
    Recurring {
        #[command(subcommand)]
        action: RecurringAction,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// Materialize due occurrences once
    Run {
        /// Run date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}
