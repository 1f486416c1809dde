//! Domain Layer - Errors
//!
//! Validation failures are raised before any remote call; remote failures
//! carry the store's message and whether a retry could succeed.

use serde::Serialize;
use thiserror::Error;

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type returned by remote store calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Reasons a template submission is rejected locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
pub enum ValidationError {
    #[error("Template title is required")]
    EmptyTitle,
    #[error("Template category is required")]
    EmptyCategory,
    #[error("Template description is required")]
    EmptyDescription,
    #[error("Every question needs text and a category, and at least one question is required")]
    NoItems,
    #[error("Choice questions need at least two non-empty options")]
    InvalidChoiceOptions,
    #[error("The same question appears more than once")]
    RepeatedItem,
    #[error("A template with this title already exists in this category")]
    DuplicateTemplate,
    #[error("Shared templates cannot be modified")]
    ReadOnlyTemplate,
}

/// Which remote operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemoteErrorKind {
    ListFailed,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
    SaveFailed,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::ListFailed => "list failed",
            RemoteErrorKind::CreateFailed => "create failed",
            RemoteErrorKind::UpdateFailed => "update failed",
            RemoteErrorKind::DeleteFailed => "delete failed",
            RemoteErrorKind::SaveFailed => "save failed",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the remote template store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Transient failures (timeouts, 5xx, throttling) may succeed on retry
    pub retryable: bool,
}

impl RemoteError {
    /// A failure that will not go away by retrying
    pub fn fatal(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: true,
        }
    }

    /// Re-label under another kind, keeping the underlying message
    pub fn into_kind(self, kind: RemoteErrorKind) -> Self {
        Self { kind, ..self }
    }
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Remote failure kind, if this error came from the remote store
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            DomainError::Remote(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}
