//! Queries over the [`entity`] tables.
//!
//! Functions that only read or write a single statement are generic over
//! [`sea_orm::ConnectionTrait`] so they run both on the pool and inside a
//! transaction.

pub mod snippet;
pub mod tag;
pub mod user;

use sea_orm::{DbErr, SqlErr};

/// Whether `err` was raised by a unique index.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
