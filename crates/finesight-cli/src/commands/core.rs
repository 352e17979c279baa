//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_store` - Shared utility to open the configured storage backend
//! - `cmd_init` - Initialize the database
//! - `cmd_recurring_run` - Run the recurring advancer once

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use finesight_core::{models::today, recurring, Database, MemoryStore, SharedStore};

use crate::cli::StorageKind;

/// Global storage flags shared by every command
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub db_path: PathBuf,
    pub storage: StorageKind,
    pub no_encrypt: bool,
}

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(options: &StoreOptions) -> Result<Database> {
    let path_str = options
        .db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if options.no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Open the storage backend selected with --storage
pub fn open_store(options: &StoreOptions) -> Result<SharedStore> {
    match options.storage {
        StorageKind::Sqlite => Ok(Arc::new(open_db(options)?)),
        StorageKind::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

pub fn cmd_init(options: &StoreOptions) -> Result<()> {
    if options.storage == StorageKind::Memory {
        println!("ℹ️  In-memory storage needs no initialization; records are lost on exit.");
        return Ok(());
    }

    println!(
        "🔧 Initializing database at {}...",
        options.db_path.display()
    );

    let db = open_db(options)?;

    if options.no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if db.is_encrypted().unwrap_or(false) {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Start the API: finesight serve");
    println!("  2. Point the mobile app at http://<host>:3001/api");

    Ok(())
}

pub fn cmd_recurring_run(options: &StoreOptions, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let store = open_store(options)?;
    let run_date = date.unwrap_or_else(today);

    if !json {
        println!("🔁 Processing recurring transactions due on {}...", run_date);
    }

    let report = recurring::run_due(store.as_ref(), run_date)
        .context("Failed to run recurring transactions")?;

    if json {
        let output =
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", output);
        return Ok(());
    }

    println!("   Created:  {}", report.processed);
    println!("   Skipped:  {} (already run today)", report.skipped_already_run);
    if report.failed > 0 {
        println!("   ⚠️  Failed: {}", report.failed);
    }
    for id in &report.created_expense_ids {
        println!("   + expense {}", id);
    }

    Ok(())
}
