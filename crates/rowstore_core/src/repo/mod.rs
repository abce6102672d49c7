//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for files and rows.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`FileNotFound`, `RowNotFound`)
//!   in addition to DB transport errors.
//! - Repositories refuse connections whose schema is not fully migrated.

pub mod error;
pub mod file_repo;
pub mod row_repo;
mod schema;
