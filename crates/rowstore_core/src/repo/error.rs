//! Repository error type shared by file and row persistence.

use crate::db::DbError;
use crate::model::file::FileId;
use crate::model::row::RowId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from file/row repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target file does not exist.
    FileNotFound(FileId),
    /// Target row does not exist in the given file.
    RowNotFound { file_id: FileId, row_id: RowId },
    /// No position could be found for a slot even after rebalancing.
    PositionExhausted { file_id: FileId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::FileNotFound(id) => write!(f, "file not found: {id}"),
            Self::RowNotFound { file_id, row_id } => {
                write!(f, "row not found: {row_id} in file {file_id}")
            }
            Self::PositionExhausted { file_id } => write!(
                f,
                "no free position left in file {file_id} after rebalance"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "row store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "row store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "row store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted row data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
