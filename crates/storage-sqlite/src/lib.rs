//! SQLite storage implementation for the pact engine.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in `accord-core`
//! and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for all domain entities
//! - Database-specific model types (with Diesel derives)
//! - The filesystem evidence store
//!
//! This crate is the only place where Diesel dependencies exist; `accord-core`
//! is database-agnostic and works with traits.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod change_requests;
pub mod checkins;
pub mod evidence;
pub mod goals;
pub mod groups;
pub mod settlement;

// Re-export database utilities
pub use db::{create_pool, get_connection, get_db_path, init, run_migrations, setup};

// Re-export storage errors and conversion helpers
pub use errors::{DieselErrorExt, StorageError};

// Re-export from accord-core for convenience
pub use accord_core::db::{DbConnection, DbPool, DbTransactionExecutor, PooledDbConnection};
pub use accord_core::errors::{DatabaseError, Error, Result};
