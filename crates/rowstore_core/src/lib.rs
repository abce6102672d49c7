//! Core logic for the ordered row store.
//! Rows of an uploaded file keep a fractional position key so inserts and
//! drag-and-drop moves never renumber their neighbours.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::file::{FileId, FileRecord};
pub use model::row::{Row, RowId};
pub use repo::error::{RepoError, RepoResult};
pub use repo::file_repo::{FileRepository, SqliteFileRepository};
pub use repo::row_repo::{RowRepository, SqliteRowRepository};
pub use service::error_kind::ErrorKind;
pub use service::file_locks::FileLocks;
pub use service::file_service::{FileService, FileServiceError};
pub use service::row_service::{RowPage, RowPages, RowService, RowServiceError};

/// Minimal health-check API for embedding hosts.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
