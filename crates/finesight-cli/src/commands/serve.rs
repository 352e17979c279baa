//! Server command implementation

use anyhow::Result;
use finesight_core::AIClient;

use super::{open_store, StoreOptions};
use crate::cli::StorageKind;

/// Whether the daily recurring job should run inside the server
///
/// `--no-recurring` wins; otherwise `FINESIGHT_RECURRING` set to `off`,
/// `false` or `0` disables it.
pub fn recurring_enabled(no_recurring: bool, env_value: Option<&str>) -> bool {
    if no_recurring {
        return false;
    }
    !matches!(
        env_value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("off" | "false" | "0")
    )
}

pub async fn cmd_serve(
    options: &StoreOptions,
    host: &str,
    port: u16,
    no_recurring: bool,
) -> Result<()> {
    println!("🚀 Starting Finesight API server...");
    match options.storage {
        StorageKind::Sqlite => println!("   Database: {}", options.db_path.display()),
        StorageKind::Memory => println!("   Storage: in-memory (records are lost on exit)"),
    }
    println!("   Listening: http://{}:{}", host, port);

    let allowed_origins = finesight_server::ServerConfig::parse_origins(
        &std::env::var("FINESIGHT_ALLOWED_ORIGINS").unwrap_or_default(),
    );
    if allowed_origins.is_empty() {
        println!("   🌐 CORS: any origin (set FINESIGHT_ALLOWED_ORIGINS to restrict)");
    } else {
        println!("   🌐 CORS: {}", allowed_origins.join(", "));
    }

    let recurring = recurring_enabled(
        no_recurring,
        std::env::var("FINESIGHT_RECURRING").ok().as_deref(),
    );
    let rate_limit = finesight_server::RateLimitConfig::from_env_value(
        std::env::var("FINESIGHT_RATE_LIMIT").ok().as_deref(),
    );
    match rate_limit {
        Some(limit) => println!(
            "   🚦 Rate limit: {} requests per {} minutes per IP",
            limit.max_requests,
            limit.window.as_secs() / 60
        ),
        None => println!("   ⚠️  Rate limit DISABLED (FINESIGHT_RATE_LIMIT=off)"),
    }
    if options.no_encrypt && options.storage == StorageKind::Sqlite {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let store = open_store(options)?;
    let ai = AIClient::from_env();

    let config = finesight_server::ServerConfig {
        allowed_origins,
        recurring_enabled: recurring,
        rate_limit,
    };

    finesight_server::serve(store, ai, host, port, config).await?;

    Ok(())
}
