//! File container use-case service.
//!
//! # Responsibility
//! - Create, list, load and delete files that own ordered rows.
//!
//! # Invariants
//! - Display name is non-blank and stored trimmed.
//! - Deleting a file waits for in-flight row mutations on that file.

use super::error_kind::ErrorKind;
use super::file_locks::FileLocks;
use crate::model::file::{FileId, FileRecord};
use crate::repo::error::RepoError;
use crate::repo::file_repo::FileRepository;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Errors from file service operations.
#[derive(Debug)]
pub enum FileServiceError {
    /// Display name is blank after trim.
    InvalidDisplayName,
    /// Target file does not exist.
    FileNotFound(FileId),
    /// Repository-level failure.
    Repo(RepoError),
}

impl FileServiceError {
    /// Classifies the error for transport collaborators.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDisplayName => ErrorKind::InvalidArgument,
            Self::FileNotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Unavailable,
        }
    }
}

impl Display for FileServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDisplayName => write!(f, "display name must not be blank"),
            Self::FileNotFound(id) => write!(f, "file not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FileServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FileServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::FileNotFound(file_id) => Self::FileNotFound(file_id),
            other => Self::Repo(other),
        }
    }
}

/// File service facade.
pub struct FileService<R: FileRepository> {
    repo: R,
    locks: Arc<FileLocks>,
}

impl<R: FileRepository> FileService<R> {
    /// Creates service with a private lock registry.
    pub fn new(repo: R) -> Self {
        Self::with_locks(repo, Arc::new(FileLocks::new()))
    }

    /// Creates service sharing a lock registry with row services.
    pub fn with_locks(repo: R, locks: Arc<FileLocks>) -> Self {
        Self { repo, locks }
    }

    /// Creates one empty file.
    pub fn create_file(
        &self,
        display_name: impl Into<String>,
    ) -> Result<FileRecord, FileServiceError> {
        let normalized = normalize_display_name(display_name.into())?;
        let file = self.repo.create_file(normalized.as_str())?;
        info!(
            "event=file_create module=files status=ok file_id={}",
            file.file_id
        );
        Ok(file)
    }

    /// Loads one file.
    pub fn get_file(&self, file_id: FileId) -> Result<FileRecord, FileServiceError> {
        self.repo
            .get_file(file_id)?
            .ok_or(FileServiceError::FileNotFound(file_id))
    }

    /// Lists all files in creation order.
    pub fn list_files(&self) -> Result<Vec<FileRecord>, FileServiceError> {
        self.repo.list_files().map_err(Into::into)
    }

    /// Deletes a file together with all of its rows.
    pub fn delete_file(&self, file_id: FileId) -> Result<(), FileServiceError> {
        let result = self
            .locks
            .with_file(file_id, || self.repo.delete_file(file_id));
        match result {
            Ok(()) => {
                info!(
                    "event=file_delete module=files status=ok file_id={}",
                    file_id
                );
                Ok(())
            }
            Err(err) => {
                let err = FileServiceError::from(err);
                warn!(
                    "event=file_delete module=files status=error file_id={} error_kind={} error={}",
                    file_id,
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn normalize_display_name(value: String) -> Result<String, FileServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FileServiceError::InvalidDisplayName);
    }
    Ok(trimmed.to_string())
}
