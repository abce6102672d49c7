//! Ordered row store use-case service.
//!
//! # Responsibility
//! - Validate caller input (ordinal indexes, page sizes, row content).
//! - Serialize mutations per file through the shared [`FileLocks`] registry.
//! - Expose ordered listing, pagination and order-preserving mutations.
//!
//! # Invariants
//! - Callers address rows by ordinal index only, never by raw position.
//! - Mutations on one file never interleave; reads never take the file lock.
//! - Errors are returned, never retried or swallowed.

use super::error_kind::ErrorKind;
use super::file_locks::FileLocks;
use crate::model::file::FileId;
use crate::model::row::{is_blank_content, Row, RowId};
use crate::repo::error::RepoError;
use crate::repo::row_repo::RowRepository;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Errors from ordered row service operations.
#[derive(Debug)]
pub enum RowServiceError {
    /// Edited content is blank after trim.
    BlankContent { file_id: FileId, row_id: RowId },
    /// Content of a newly inserted row is blank after trim.
    BlankInsert { file_id: FileId },
    /// Page size must be at least one.
    InvalidPageSize,
    /// Ordinal index is below zero.
    NegativeIndex(i64),
    /// Target file does not exist.
    FileNotFound(FileId),
    /// Target row does not exist in the given file.
    RowNotFound { file_id: FileId, row_id: RowId },
    /// A rebalance was required and still left no room for the slot.
    Conflict { file_id: FileId },
    /// Repository-level failure.
    Repo(RepoError),
}

impl RowServiceError {
    /// Classifies the error for transport collaborators.
    ///
    /// Every [`RowServiceError::Repo`] failure maps to `Unavailable`, including
    /// corrupt persisted data and connections that are not fully migrated.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BlankContent { .. }
            | Self::BlankInsert { .. }
            | Self::InvalidPageSize
            | Self::NegativeIndex(_) => ErrorKind::InvalidArgument,
            Self::FileNotFound(_) | Self::RowNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Repo(_) => ErrorKind::Unavailable,
        }
    }
}

impl Display for RowServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankContent { file_id, row_id } => write!(
                f,
                "row content must not be blank: {row_id} in file {file_id}"
            ),
            Self::BlankInsert { file_id } => {
                write!(f, "new row content must not be blank in file {file_id}")
            }
            Self::InvalidPageSize => write!(f, "page size must be a positive integer"),
            Self::NegativeIndex(index) => {
                write!(f, "ordinal index must not be negative, got {index}")
            }
            Self::FileNotFound(id) => write!(f, "file not found: {id}"),
            Self::RowNotFound { file_id, row_id } => {
                write!(f, "row not found: {row_id} in file {file_id}")
            }
            Self::Conflict { file_id } => {
                write!(f, "rebalance could not free a position in file {file_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RowServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RowServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::FileNotFound(file_id) => Self::FileNotFound(file_id),
            RepoError::RowNotFound { file_id, row_id } => Self::RowNotFound { file_id, row_id },
            RepoError::PositionExhausted { file_id } => Self::Conflict { file_id },
            other => Self::Repo(other),
        }
    }
}

/// One page of the ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage {
    /// Rows of the page in display order. Empty for out-of-range pages.
    pub rows: Vec<Row>,
    /// Total number of rows in the file when the page was read.
    pub total_count: u64,
    /// Zero-based page index that was requested.
    pub page_index: u64,
    /// Page size that was requested.
    pub page_size: u32,
}

impl RowPage {
    /// Number of pages needed to show `total_count` rows.
    pub fn page_count(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.page_size))
    }
}

/// Ordered row store facade.
pub struct RowService<R: RowRepository> {
    repo: R,
    locks: Arc<FileLocks>,
}

impl<R: RowRepository> RowService<R> {
    /// Creates service with a private lock registry.
    pub fn new(repo: R) -> Self {
        Self::with_locks(repo, Arc::new(FileLocks::new()))
    }

    /// Creates service sharing a lock registry with other services.
    pub fn with_locks(repo: R, locks: Arc<FileLocks>) -> Self {
        Self { repo, locks }
    }

    /// Returns the lock registry used by this service.
    pub fn locks(&self) -> &Arc<FileLocks> {
        &self.locks
    }

    /// Lists every row of a file ascending by position.
    pub fn list_ordered(&self, file_id: FileId) -> Result<Vec<Row>, RowServiceError> {
        self.repo.list_ordered(file_id).map_err(Into::into)
    }

    /// Returns rows `[page_index * page_size, page_index * page_size + page_size)`.
    ///
    /// Out-of-range pages yield no rows rather than an error.
    pub fn page_of(
        &self,
        file_id: FileId,
        page_index: u64,
        page_size: u32,
    ) -> Result<RowPage, RowServiceError> {
        if page_size == 0 {
            return Err(RowServiceError::InvalidPageSize);
        }
        let offset = page_index.saturating_mul(u64::from(page_size));
        let (rows, total_count) = self.repo.page(file_id, offset, page_size)?;
        Ok(RowPage {
            rows,
            total_count,
            page_index,
            page_size,
        })
    }

    /// Returns a lazy page-by-page iterator over the ordered rows.
    ///
    /// Each step reads a fresh page, so rows changed between steps may show
    /// up as a stale view but never as a partially written row.
    pub fn pages(&self, file_id: FileId, page_size: u32) -> Result<RowPages<'_, R>, RowServiceError> {
        if page_size == 0 {
            return Err(RowServiceError::InvalidPageSize);
        }
        Ok(RowPages {
            service: self,
            file_id,
            page_size,
            next_page: 0,
            finished: false,
        })
    }

    /// Loads one row of a file.
    pub fn get_row(&self, file_id: FileId, row_id: RowId) -> Result<Row, RowServiceError> {
        self.repo
            .get_row(file_id, row_id)?
            .ok_or(RowServiceError::RowNotFound { file_id, row_id })
    }

    /// Inserts a row so it lands at ordinal `anchor_index`.
    ///
    /// `0` inserts before the first row; the row count (or anything larger)
    /// appends after the last row. Blank content is rejected.
    pub fn insert_before(
        &self,
        file_id: FileId,
        anchor_index: i64,
        content: impl Into<String>,
    ) -> Result<Row, RowServiceError> {
        let anchor = ordinal(anchor_index)?;
        let content = content.into();
        if is_blank_content(content.as_str()) {
            return Err(RowServiceError::BlankInsert { file_id });
        }
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo
                .insert_at(file_id, anchor, content.as_str())
                .map_err(RowServiceError::from)
        });
        log_outcome("row_insert", file_id, started_at, result, |row| {
            info!(
                "event=row_insert module=rows status=ok file_id={} row_id={} anchor_index={} position={}",
                file_id,
                row.row_id,
                anchor,
                row.position_label()
            );
        })
    }

    /// Appends rows after the current last row in input order.
    ///
    /// Used when materializing an uploaded file; each row gets the same
    /// position as repeated appends through [`Self::insert_before`] would.
    /// Blank cells are kept as they are.
    pub fn append_rows(
        &self,
        file_id: FileId,
        contents: &[String],
    ) -> Result<Vec<Row>, RowServiceError> {
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo
                .append_all(file_id, contents)
                .map_err(RowServiceError::from)
        });
        log_outcome("rows_append", file_id, started_at, result, |rows| {
            info!(
                "event=rows_append module=rows status=ok file_id={} rows={}",
                file_id,
                rows.len()
            );
        })
    }

    /// Moves a row to ordinal `target_index` of the current ordering.
    ///
    /// Returns the row unchanged when the slot resolves to where it already is.
    pub fn move_row(
        &self,
        file_id: FileId,
        row_id: RowId,
        target_index: i64,
    ) -> Result<Row, RowServiceError> {
        let target = ordinal(target_index)?;
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo
                .move_to(file_id, row_id, target)
                .map_err(RowServiceError::from)
        });
        log_outcome("row_move", file_id, started_at, result, |row| {
            info!(
                "event=row_move module=rows status=ok file_id={} row_id={} target_index={} position={}",
                file_id,
                row.row_id,
                target,
                row.position_label()
            );
        })
    }

    /// Replaces row content; the position is left untouched.
    pub fn edit_row(
        &self,
        file_id: FileId,
        row_id: RowId,
        new_content: impl Into<String>,
    ) -> Result<Row, RowServiceError> {
        let new_content = new_content.into();
        if is_blank_content(new_content.as_str()) {
            return Err(RowServiceError::BlankContent { file_id, row_id });
        }
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo
                .update_content(file_id, row_id, new_content.as_str())
                .map_err(RowServiceError::from)
        });
        log_outcome("row_edit", file_id, started_at, result, |row| {
            info!(
                "event=row_edit module=rows status=ok file_id={} row_id={} content_len={}",
                file_id,
                row.row_id,
                row.content.len()
            );
        })
    }

    /// Deletes a row permanently. A repeated delete reports `RowNotFound`.
    pub fn delete_row(&self, file_id: FileId, row_id: RowId) -> Result<(), RowServiceError> {
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo
                .delete_row(file_id, row_id)
                .map_err(RowServiceError::from)
        });
        log_outcome("row_delete", file_id, started_at, result, |_| {
            info!(
                "event=row_delete module=rows status=ok file_id={} row_id={}",
                file_id, row_id
            );
        })
    }

    /// Reassigns evenly spaced positions to every row of a file.
    pub fn rebalance(&self, file_id: FileId) -> Result<usize, RowServiceError> {
        let started_at = Instant::now();
        let result = self.locks.with_file(file_id, || {
            self.repo.rebalance(file_id).map_err(RowServiceError::from)
        });
        log_outcome("rows_rebalance", file_id, started_at, result, |rewritten| {
            info!(
                "event=rows_rebalance module=rows status=ok reason=requested file_id={} rows={}",
                file_id, rewritten
            );
        })
    }
}

/// Lazy iterator over the pages of one file.
///
/// Yields non-empty pages in order and stops after the last one or after the
/// first error. [`RowPages::restart`] rewinds to the first page.
pub struct RowPages<'a, R: RowRepository> {
    service: &'a RowService<R>,
    file_id: FileId,
    page_size: u32,
    next_page: u64,
    finished: bool,
}

impl<R: RowRepository> RowPages<'_, R> {
    /// Rewinds the iterator so the next step reads page zero again.
    pub fn restart(&mut self) {
        self.next_page = 0;
        self.finished = false;
    }
}

impl<R: RowRepository> Iterator for RowPages<'_, R> {
    type Item = Result<Vec<Row>, RowServiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self
            .service
            .page_of(self.file_id, self.next_page, self.page_size)
        {
            Ok(page) => {
                if page.rows.is_empty() {
                    self.finished = true;
                    return None;
                }
                self.next_page += 1;
                if self.next_page >= page.page_count() {
                    self.finished = true;
                }
                Some(Ok(page.rows))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn ordinal(index: i64) -> Result<u64, RowServiceError> {
    u64::try_from(index).map_err(|_| RowServiceError::NegativeIndex(index))
}

fn log_outcome<T>(
    event: &'static str,
    file_id: FileId,
    started_at: Instant,
    result: Result<T, RowServiceError>,
    on_ok: impl FnOnce(&T),
) -> Result<T, RowServiceError> {
    match &result {
        Ok(value) => {
            on_ok(value);
            debug!(
                "event={} module=rows status=done file_id={} duration_ms={}",
                event,
                file_id,
                started_at.elapsed().as_millis()
            );
        }
        Err(err) => warn!(
            "event={} module=rows status=error file_id={} duration_ms={} error_kind={} error={}",
            event,
            file_id,
            started_at.elapsed().as_millis(),
            err.kind(),
            err
        ),
    }
    result
}
