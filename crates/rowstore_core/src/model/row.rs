//! Row domain model.
//!
//! # Responsibility
//! - Define the record stored for one line of an uploaded file.
//!
//! # Invariants
//! - `row_id` is assigned at creation and never reused or changed.
//! - `position` is only written by the row repository; callers address rows
//!   by ordinal index, never by raw position.
//! - Editing `content` never changes `position`.

use super::file::FileId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable row identifier.
pub type RowId = Uuid;

/// One ordered row belonging to exactly one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Stable row id.
    pub row_id: RowId,
    /// Owning file.
    pub file_id: FileId,
    /// Ordering key among rows of the same file. Opaque to callers.
    pub position: f64,
    /// Free text payload.
    pub content: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Row {
    /// Renders `position` with fixed precision for debugging output.
    ///
    /// The label is display-only and must not be parsed back into a key.
    pub fn position_label(&self) -> String {
        format!("{:.6}", self.position)
    }
}

/// Returns whether `content` is empty after trimming.
pub fn is_blank_content(content: &str) -> bool {
    content.trim().is_empty()
}
