//! File domain model.
//!
//! # Invariants
//! - `file_id` is stable and unique.
//! - A file is immutable after creation except for its row set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable file identifier.
pub type FileId = Uuid;

/// Named container owning zero or more rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable file id.
    pub file_id: FileId,
    /// User-facing name, trimmed and non-blank.
    pub display_name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Number of rows currently owned by the file.
    pub row_count: u64,
}
