//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and
//! convert them to the database-agnostic error types defined in `accord-core`.

use accord_core::errors::{DatabaseError, Error};
use diesel::result::Error as DieselError;
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `accord_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::NotFound("record not found".to_string())
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::SerializationError(e) => Error::Database(DatabaseError::Internal(e)),
        }
    }
}

/// Extension trait to convert Diesel errors to core errors.
///
/// Since we can't implement `From<DieselError> for Error` due to orphan
/// rules, this trait provides a method to perform the conversion.
pub trait DieselErrorExt {
    fn into_core_error(self) -> Error;
}

impl DieselErrorExt for DieselError {
    fn into_core_error(self) -> Error {
        StorageError::QueryFailed(self).into()
    }
}

impl DieselErrorExt for r2d2::Error {
    fn into_core_error(self) -> Error {
        StorageError::PoolError(self).into()
    }
}

impl DieselErrorExt for diesel::ConnectionError {
    fn into_core_error(self) -> Error {
        StorageError::ConnectionFailed(self).into()
    }
}

/// Maps a status string loaded from the database that no enum variant
/// recognizes. Indicates schema drift or manual edits.
pub fn unknown_enum_value(column: &str, value: &str) -> Error {
    Error::Database(DatabaseError::Internal(format!(
        "unrecognized {column} value '{value}'"
    )))
}
