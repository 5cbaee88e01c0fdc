//! Database layer for the SQLite backing store.
//!
//! This module handles:
//! - Connection pool management with WAL mode
//! - Schema migrations
//! - Per-entity query modules (`teams`, `users`, `pull_requests`, `reviews`)
//! - The [`Transactor`] that scopes units of work
//!
//! Query functions take an explicit `&mut SqliteConnection`. Inside a unit of
//! work that connection is the open transaction, so every statement a service
//! issues is visibly part of it.

pub mod pool;
pub mod pull_requests;
pub mod reviews;
pub mod teams;
pub mod transactor;
pub mod users;

pub use pool::DbPool;
pub use transactor::{Transactor, UnitOfWork};

use sqlx::error::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// Errors raised while opening or migrating the database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Errors returned by the per-entity query functions.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No row matched, or a foreign key pointed at a missing row.
    #[error("record not found")]
    NotFound,

    /// A primary key or unique constraint rejected the write.
    #[error("record already exists")]
    AlreadyExists,

    /// The write would move a row back to an earlier state.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl RepoError {
    /// Classify a write failure by the constraint it violated.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.kind() {
                ErrorKind::UniqueViolation => return Self::AlreadyExists,
                ErrorKind::ForeignKeyViolation => return Self::NotFound,
                _ => {}
            }
        }
        Self::Sqlx(err)
    }
}

/// Ordered list of embedded migrations.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_initial_schema",
    include_str!("migrations/0001_initial_schema.sql"),
)];

/// Initialize the database: create the file if needed and run migrations.
///
/// # Arguments
/// * `db_path` - Path to the SQLite database file
/// * `max_connections` - Pool size
///
/// # Returns
/// A connection pool configured with WAL mode
pub async fn initialize(db_path: &Path, max_connections: u32) -> Result<DbPool, DbError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Migration(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    let pool = pool::create_pool(db_path, max_connections).await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run all pending database migrations.
///
/// Each migration runs in its own transaction together with the row that
/// records it, so a failed migration leaves no trace.
async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (name, sql) in MIGRATIONS {
        let mut tx = pool.begin().await?;

        let applied: Option<(i64,)> = sqlx::query_as("SELECT id FROM _migrations WHERE name = ?")
            .bind(*name)
            .fetch_optional(&mut *tx)
            .await?;

        if applied.is_some() {
            continue;
        }

        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("{} failed: {}", name, e)))?;

        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("applied migration {}", name);
    }

    Ok(())
}
