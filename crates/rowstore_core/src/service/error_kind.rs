//! Caller-facing error classification.

use std::fmt::{Display, Formatter};

/// Coarse error category every service error maps to.
///
/// Transport collaborators use this to pick a status code and decide
/// whether a retry is worth it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File or row does not exist.
    NotFound,
    /// Caller input rejected before touching storage.
    InvalidArgument,
    /// A rebalance was required and could not complete.
    Conflict,
    /// Underlying storage failed; propagated unmodified.
    Unavailable,
}

impl ErrorKind {
    /// Stable snake_case label used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
