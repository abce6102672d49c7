//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own per-file write serialization and caller-facing error kinds.
//! - Keep transport/UI collaborators decoupled from storage details.

pub mod error_kind;
pub mod file_locks;
pub mod file_service;
pub mod row_service;
