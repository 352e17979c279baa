//! Finesight CLI - Personal finance backend
//!
//! Usage:
//!   finesight init                   Initialize database
//!   finesight serve --port 3001      Start web server
//!   finesight recurring run          Materialize due recurring expenses

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let options = commands::StoreOptions {
        db_path: cli.db,
        storage: cli.storage,
        no_encrypt: cli.no_encrypt,
    };

    match cli.command {
        Commands::Init => commands::cmd_init(&options),
        Commands::Serve {
            port,
            host,
            no_recurring,
        } => commands::cmd_serve(&options, &host, port, no_recurring).await,
        Commands::Recurring { action } => match action {
            RecurringAction::Run { date, json } => {
                commands::cmd_recurring_run(&options, date, json)
            }
        },
    }
}
