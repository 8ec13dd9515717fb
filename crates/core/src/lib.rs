//! Core engine for accountability groups: goal lifecycle, unanimous-consent
//! change requests, evidenced check-ins with supervisor review, and
//! settlement with category completion streaks.
//!
//! Storage lives behind repository traits; `accord-storage-sqlite` provides
//! the Diesel/SQLite implementation. Services are generic over a
//! [`db::DbTransactionExecutor`] so every state change runs inside one
//! transaction with conditional status writes underneath.

pub mod change_requests;
pub mod checkins;
pub mod constants;
pub mod db;
pub mod errors;
pub mod events;
pub mod goals;
pub mod groups;
pub mod scheduler;
pub mod settlement;
pub mod utils;

#[cfg(test)]
pub(crate) mod mocks;

pub use errors::{Error, Result};
