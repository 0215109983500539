//! Row decoding and error mapping shared by the PostgreSQL repositories.

use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};

use crate::domain::foundation::{DomainError, ErrorCode};

const UNIQUE_VIOLATION: &str = "23505";

/// Reads `column`, reporting decode failures as database errors.
pub(super) fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, DomainError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", column), e))
}

/// Maps an insert failure, turning unique violations into `DuplicateRecord`.
pub(super) fn insert_error(context: &str, err: sqlx::Error) -> DomainError {
    let unique = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);
    if unique {
        DomainError::new(ErrorCode::DuplicateRecord, format!("{}: {}", context, err))
    } else {
        DomainError::database(context, err)
    }
}

/// Parses a stored enum column.
pub(super) fn parse_column<T, E>(
    column: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, DomainError>
where
    E: std::fmt::Display,
{
    parse(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} '{}': {}", column, value, e),
        )
    })
}

/// Converts a duration for an `INTEGER` column, rejecting values it cannot hold.
pub(super) fn seconds_column(seconds: Option<u32>) -> Result<Option<i32>, DomainError> {
    seconds
        .map(i32::try_from)
        .transpose()
        .map_err(|_| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Duration of {:?} seconds is out of range", seconds),
            )
        })
}
