//! Error types for the engagement pipeline.
//!
//! Collaborators speak `anyhow::Result`; the pipeline speaks [`EngageError`].
//! The mapping happens at the call site so the error names the collaborator
//! that failed rather than the transport detail underneath it.

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EngageError>;

/// Failures a pipeline operation can report to its caller.
#[derive(Debug, Error)]
pub enum EngageError {
    /// The target content or the record itself does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// A uniqueness invariant would be violated.
    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    /// Self-target, ineligible vote, or an action the state machine rejects.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The actor does not own the record and is not an admin.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed input reached the pipeline.
    #[error("validation error: {0}")]
    Validation(String),

    /// A mandatory collaborator call failed.
    #[error("{dependency} unavailable: {source}")]
    DependencyUnavailable {
        dependency: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl EngageError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::DuplicateRecord(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(dependency: &'static str, source: anyhow::Error) -> Self {
        Self::DependencyUnavailable { dependency, source }
    }

    /// Map a record store failure, recognising constraint violations.
    pub(crate) fn from_store(source: anyhow::Error, duplicate_msg: &str) -> Self {
        if source.downcast_ref::<UniqueViolation>().is_some() {
            Self::DuplicateRecord(duplicate_msg.to_string())
        } else {
            Self::DependencyUnavailable {
                dependency: "record store",
                source,
            }
        }
    }
}

/// Marker error a store returns when its own uniqueness constraint rejects
/// an insert. The pipeline reports it as [`EngageError::DuplicateRecord`].
#[derive(Debug, Clone, Error)]
#[error("unique constraint violated: {constraint}")]
pub struct UniqueViolation {
    pub constraint: String,
}

impl UniqueViolation {
    pub fn new(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
        }
    }
}

/// Coarse classification for the request layer.
///
/// Safe to expose to clients: the category never carries collaborator
/// detail, only the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Unprocessable,
    Forbidden,
    BadRequest,
    Unavailable,
}

impl ErrorCategory {
    pub fn is_client_error(self) -> bool {
        !matches!(self, ErrorCategory::Unavailable)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Unprocessable => "unprocessable",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

impl EngageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngageError::NotFound { .. } => ErrorCategory::NotFound,
            EngageError::DuplicateRecord(_) => ErrorCategory::Conflict,
            EngageError::InvalidOperation(_) => ErrorCategory::Unprocessable,
            EngageError::Forbidden(_) => ErrorCategory::Forbidden,
            EngageError::Validation(_) => ErrorCategory::BadRequest,
            EngageError::DependencyUnavailable { .. } => ErrorCategory::Unavailable,
        }
    }
}
