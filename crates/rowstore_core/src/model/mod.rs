//! Domain model for files and their ordered rows.
//!
//! # Responsibility
//! - Define canonical data structures used by the store.
//! - Own the fractional position arithmetic shared by insert and move.
//!
//! # Invariants
//! - Every row is identified by a stable `RowId` and belongs to one `FileId`.
//! - Deletion is permanent; there is no tombstone state.

pub mod file;
pub mod position;
pub mod row;
