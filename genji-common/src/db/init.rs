//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and brings the schema up to
//! date. Every table is created with `CREATE TABLE IF NOT EXISTS`, so calling
//! `init_database` against an existing file is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database file and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // Concurrent readers alongside the single writer
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Used by tests and dry runs. The pool holds exactly one connection that is
/// never recycled, since every new in-memory connection is a new database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_maps_table(pool).await?;

    // Submission unit children
    create_map_types_table(pool).await?;
    create_map_mechanics_table(pool).await?;
    create_map_restrictions_table(pool).await?;
    create_map_creators_table(pool).await?;
    create_map_ratings_table(pool).await?;
    create_guides_table(pool).await?;
    create_map_medals_table(pool).await?;
    create_map_submission_dates_table(pool).await?;

    create_records_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY,
            nickname TEXT NOT NULL,
            rank INTEGER NOT NULL DEFAULT 0,
            rank_plus INTEGER NOT NULL DEFAULT 0,
            alertable INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_maps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS maps (
            map_code TEXT PRIMARY KEY,
            map_name TEXT NOT NULL,
            checkpoints INTEGER NOT NULL,
            description TEXT,
            official INTEGER NOT NULL DEFAULT 0,
            archived INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_types (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            map_type TEXT NOT NULL,
            PRIMARY KEY (map_code, map_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_mechanics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_mechanics (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            mechanic TEXT NOT NULL,
            PRIMARY KEY (map_code, mechanic)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_restrictions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_restrictions (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            restriction TEXT NOT NULL,
            PRIMARY KEY (map_code, restriction)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_creators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_creators (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            PRIMARY KEY (map_code, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_ratings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_ratings (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            difficulty REAL NOT NULL CHECK (difficulty >= 0 AND difficulty <= 10),
            PRIMARY KEY (map_code, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_guides_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS guides (
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            url TEXT NOT NULL,
            PRIMARY KEY (map_code, url)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_map_medals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_medals (
            map_code TEXT PRIMARY KEY REFERENCES maps(map_code) ON DELETE CASCADE,
            gold REAL,
            silver REAL,
            bronze REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cooldown bookkeeping for non-privileged submitters
async fn create_map_submission_dates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS map_submission_dates (
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            map_code TEXT NOT NULL REFERENCES maps(map_code) ON DELETE CASCADE,
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Completion records, written by the record-verification flow
async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            map_code TEXT NOT NULL REFERENCES maps(map_code),
            time REAL NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_map_code ON records(map_code)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_user_id ON records(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
