//! Transaction scoping for units of work.
//!
//! A unit of work is a closure that receives the open transaction's
//! connection and returns a boxed future. Units that need to compose simply
//! call each other's `*_in_tx` functions with the same connection, which keeps
//! them inside the outer transaction.

use crate::db::DbPool;
use crate::error::AppError;
use futures::future::BoxFuture;
use sqlx::SqliteConnection;

/// Future returned by a unit of work borrowing the transaction connection.
pub type UnitOfWork<'c, T> = BoxFuture<'c, Result<T, AppError>>;

/// Runs units of work atomically against the pool.
#[derive(Debug, Clone)]
pub struct Transactor {
    pool: DbPool,
}

impl Transactor {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run a read-write unit of work.
    ///
    /// The transaction starts with `BEGIN IMMEDIATE`, so the write lock is
    /// held from the first statement and concurrent writers queue behind it.
    /// Commits when the unit returns `Ok`, rolls back otherwise. If the
    /// returned future is dropped before completion the transaction is rolled
    /// back when the handle is dropped.
    pub async fn run<T, F>(&self, unit: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> UnitOfWork<'c, T> + Send,
    {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        match unit(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!("rollback failed after '{}': {}", err, rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Run a read-only unit of work on a single snapshot.
    ///
    /// Uses a deferred transaction: readers never take the write lock, and
    /// WAL gives every statement in the unit the same view of the database.
    pub async fn run_read_only<T, F>(&self, unit: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> UnitOfWork<'c, T> + Send,
    {
        let mut tx = self.pool.begin().await?;
        let result = unit(&mut *tx).await;

        if let Err(err) = tx.rollback().await {
            log::warn!("failed to release read snapshot: {}", err);
        }

        result
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
