//! Database transaction seam.
//!
//! The engine's state machines are read-check-then-write sequences ("is the
//! vote unanimous", "is the goal still SETTLING") that must be atomic against
//! concurrent callers. Services therefore never touch connections directly;
//! they hand a closure to a [`DbTransactionExecutor`], which runs it inside
//! one immediate transaction. Repository traits take the transaction
//! connection explicitly so every step of a cascade shares it.
//!
//! Pool construction and migrations live in the storage crate; this module
//! only defines the seam so core services stay storage-setup-agnostic.

use std::sync::Arc;

use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::errors::{DatabaseError, Error, Result};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = SqliteConnection;
pub type PooledDbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Trait for executing database transactions.
pub trait DbTransactionExecutor {
    /// Executes `f` inside a single transaction, committing on `Ok` and
    /// rolling back on `Err`. The domain error produced by `f` is returned
    /// unchanged so callers can match on it.
    fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DbConnection) -> Result<T>;
}

impl DbTransactionExecutor for DbPool {
    fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DbConnection) -> Result<T>,
    {
        let mut conn = self.get()?;

        // SQLite immediate transactions take the write lock up front, so two
        // concurrent read-check-then-write sequences serialize instead of
        // failing at commit time.
        let mut captured: Option<Error> = None;
        let tx_result: std::result::Result<T, diesel::result::Error> = conn
            .immediate_transaction(|tx_conn| {
                f(tx_conn).map_err(|e| {
                    captured = Some(e);
                    diesel::result::Error::RollbackTransaction
                })
            });

        tx_result.map_err(|tx_err| match captured.take() {
            Some(domain_err) => domain_err,
            None => Error::Database(DatabaseError::TransactionFailed(tx_err.to_string())),
        })
    }
}

impl DbTransactionExecutor for Arc<DbPool> {
    fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DbConnection) -> Result<T>,
    {
        (**self).execute(f)
    }
}
