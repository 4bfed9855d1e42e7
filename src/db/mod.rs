//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool over the local
//! SQLite file and enforce schema migrations before accepting API traffic.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

/// Initialize the SQLite connection pool and run migrations.
///
/// In-memory URLs are pinned to a single connection, since every SQLite
/// connection would otherwise see its own private database.
///
/// # Errors
///
/// Returns an error if the URL is malformed, the connection fails, or a
/// migration fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { max_connections.max(1) });
    if in_memory {
        // Closing the only connection would drop the database with it.
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
