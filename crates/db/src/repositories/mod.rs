use chrono::{DateTime, Utc};
use thiserror::Error;

use hrflow_core::domain::request::RequestId;
use hrflow_core::workflow::ports::StoreError;

pub mod actor;
pub mod memory;
pub mod request;

pub use actor::SqlActorDirectory;
pub use memory::{InMemoryActorDirectory, InMemoryWorkflowStore};
pub use request::{SqlWorkflowStore, SqlWorkflowTransaction};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("version conflict on request {request_id}: expected {expected}, found {actual:?}")]
    VersionConflict { request_id: RequestId, expected: u32, actual: Option<u32> },
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::VersionConflict { request_id, expected, actual } => {
                StoreError::VersionConflict { request_id, expected, actual }
            }
            RepositoryError::Decode(message) => StoreError::Decode(message),
            RepositoryError::Database(error) => StoreError::Unavailable(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// SQLITE_BUSY_SNAPSHOT: the transaction read a version another writer has
/// since replaced.
pub(crate) fn is_stale_snapshot(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(database_error) => {
            database_error.code().is_some_and(|code| code == "517")
        }
        _ => false,
    }
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub(crate) fn parse_enum<T>(
    field: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    parse(value).ok_or_else(|| RepositoryError::Decode(format!("unknown {field} `{value}`")))
}

pub(crate) fn parse_counter(field: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{field} out of range: {value}")))
}
