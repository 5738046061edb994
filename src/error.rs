//! Error types for the privacy orchestrator.

use crate::privacy::ExportDomain;
use thiserror::Error;

/// Result type alias for privacy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for export, eligibility and erasure runs
#[derive(Debug, Error)]
pub enum Error {
    /// Data source or subject directory failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session layer failure
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The pseudonymized identity record could not be persisted
    #[error("Failed to persist subject {subject_id}: {reason}")]
    Persistence { subject_id: u64, reason: String },

    /// Erasure was requested for a subject the eligibility check refuses
    #[error("Removal denied for subject {subject_id}: {reason}")]
    RemovalDenied { subject_id: u64, reason: String },

    /// An export run stopped at a failing domain
    #[error("Export error: {0}")]
    Export(Box<ExportFailure>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Random source or other cryptographic failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name of the export domain that failed, if this is an export failure
    pub fn failed_domain(&self) -> Option<&str> {
        match self {
            Error::Export(failure) => Some(&failure.domain),
            _ => None,
        }
    }
}

impl From<ExportFailure> for Error {
    fn from(failure: ExportFailure) -> Self {
        Error::Export(Box::new(failure))
    }
}

/// Storage-level errors raised by row stores, directories and field resolvers
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Connection or pool failure
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query against a table failed
    #[error("Query failed on {table}: {reason}")]
    QueryFailed { table: String, reason: String },

    /// Write (insert, update, delete) against a table failed
    #[error("Write failed on {table}: {reason}")]
    WriteFailed { table: String, reason: String },

    /// Table or column name rejected before reaching the backend
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Row could not be converted into the expected shape
    #[error("Data conversion error: {0}")]
    ConversionError(String),
}

impl StorageError {
    pub fn query_failed(table: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::QueryFailed {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failed(table: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::WriteFailed {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Session-specific error types
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

/// Failure of one domain during an export run.
///
/// Carries the domains built before the failing one so callers can tell
/// exactly how far the run got. A failed export is never a complete export.
#[derive(Debug, Error)]
#[error("export of domain '{domain}' failed: {source}")]
pub struct ExportFailure {
    /// Name of the domain whose retrieval or construction failed
    pub domain: String,
    /// Domains completed before the failure, in emission order
    pub completed: Vec<ExportDomain>,
    #[source]
    pub source: Box<Error>,
}

impl ExportFailure {
    pub fn new(domain: impl Into<String>, completed: Vec<ExportDomain>, source: Error) -> Self {
        Self {
            domain: domain.into(),
            completed,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_failure_names_domain() {
        let failure = ExportFailure::new(
            "user notes",
            Vec::new(),
            StorageError::query_failed("user_notes", "disk I/O error").into(),
        );
        let err: Error = failure.into();

        assert_eq!(err.failed_domain(), Some("user notes"));
        assert!(err.to_string().contains("user notes"));
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_storage_error_into_session_error() {
        let err: SessionError = StorageError::ConnectionFailed("pool closed".into()).into();
        assert!(matches!(err, SessionError::Storage(msg) if msg.contains("pool closed")));
    }
}
