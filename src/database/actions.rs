pub mod attributes;
pub mod recipes;
pub mod users;

use crate::{database::error::QueryError, error::Error};

/// Maps a unique-constraint violation onto a field error; anything else is
/// a plain query failure.
pub(crate) fn unique_violation(error: sqlx::Error, field: &str, message: &str) -> Error {
    match &error {
        sqlx::Error::Database(e) if e.is_unique_violation() => Error::field(field, message),
        _ => QueryError::from(error).into(),
    }
}
