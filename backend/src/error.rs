//! Error types for the analysis gateway.
//!
//! The hierarchy mirrors the request path:
//!
//! - [`NormalizeError`] - file format normalization errors
//! - [`AnalyzerError`] - domain analyzer input errors
//! - [`RegistryError`] - analyzer registration errors
//! - [`ReasonerError`] - generic reasoner (LLM) errors
//! - [`StorageError`] - artifact log errors
//! - [`ConfigError`] - environment configuration errors
//! - [`DispatchError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Format Normalizer Errors
// =============================================================================

/// Errors while turning an uploaded file into text or a table.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// File type not handled by any extractor.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The file claims a supported format but its content is malformed.
    #[error("Failed to parse {format}: {message}")]
    Parse { format: String, message: String },
}

impl NormalizeError {
    pub fn parse(format: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Analyzer Errors
// =============================================================================

/// Errors raised by a domain analyzer on bad input.
#[derive(Debug, Error, PartialEq)]
pub enum AnalyzerError {
    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A field is present but unusable.
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The analyzer panicked instead of returning an error.
    #[error("Analyzer panicked: {0}")]
    Panicked(String),
}

impl AnalyzerError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from analyzer registration.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Domain code already bound.
    #[error("Domain already registered: {0}")]
    Duplicate(String),

    /// Candidate does not expose a usable domain code.
    #[error("Analyzer has no domain code")]
    MissingCode,
}

// =============================================================================
// Reasoner Errors
// =============================================================================

/// Errors from the generic reasoner backend.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// No credentials configured; the reasoner runs degraded.
    #[error("Reasoner unavailable: {0}")]
    Unavailable(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The backend answered with an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// The backend answered with something we cannot read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Artifact log errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Payload (de)serialization failure.
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the store.
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock poisoned by a panicking writer.
    #[error("Artifact log lock poisoned")]
    Poisoned,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Dispatch Errors (top-level)
// =============================================================================

/// Stable classification of a failed request, used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    EmptyInput,
    InvalidInput,
    UnsupportedFormat,
    ParseError,
    AnalyzerFailure,
    ServiceUnavailable,
    Storage,
}

impl ErrorKind {
    /// Client errors are caused by the request itself.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyInput
                | ErrorKind::InvalidInput
                | ErrorKind::UnsupportedFormat
                | ErrorKind::ParseError
        )
    }
}

/// Top-level orchestration errors.
///
/// This is the error side of [`crate::dispatch::Orchestrator::dispatch`]. It
/// wraps all lower-level errors and adds request validation variants.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Text payload is empty or whitespace.
    #[error("Empty input")]
    EmptyInput,

    /// Request shape not understood.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Domain analyzer rejected the payload.
    #[error("Analyzer '{domain}' failed: {source}")]
    Analyzer {
        domain: String,
        #[source]
        source: AnalyzerError,
    },

    /// Reasoner call failed.
    #[error(transparent)]
    Reasoner(#[from] ReasonerError),

    /// Artifact could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::EmptyInput => ErrorKind::EmptyInput,
            DispatchError::InvalidInput(_) => ErrorKind::InvalidInput,
            DispatchError::Normalize(NormalizeError::UnsupportedFormat(_)) => {
                ErrorKind::UnsupportedFormat
            }
            DispatchError::Normalize(NormalizeError::Parse { .. }) => ErrorKind::ParseError,
            DispatchError::Analyzer { .. } => ErrorKind::AnalyzerFailure,
            DispatchError::Reasoner(_) => ErrorKind::ServiceUnavailable,
            DispatchError::Storage(_) => ErrorKind::Storage,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not open the artifact store.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Could not bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for normalizer operations.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result type for reasoner operations.
pub type ReasonerResult<T> = Result<T, ReasonerError>;

/// Result type for artifact log operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let err: DispatchError = NormalizeError::UnsupportedFormat("exe".into()).into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.to_string().contains("exe"));

        let err: DispatchError = NormalizeError::parse("csv", "line 3").into();
        assert_eq!(err.kind(), ErrorKind::ParseError);

        let err: DispatchError = ReasonerError::Unavailable("no key".into()).into();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn test_analyzer_error_format() {
        let err = DispatchError::Analyzer {
            domain: "construction".into(),
            source: AnalyzerError::invalid("site_area_m2", "must be > 0"),
        };
        let msg = err.to_string();
        assert!(msg.contains("construction"));
        assert!(msg.contains("site_area_m2"));
        assert_eq!(err.kind(), ErrorKind::AnalyzerFailure);
        assert!(!err.kind().is_client_error());
    }

    #[test]
    fn test_client_error_kinds() {
        assert!(ErrorKind::EmptyInput.is_client_error());
        assert!(ErrorKind::ParseError.is_client_error());
        assert!(!ErrorKind::ServiceUnavailable.is_client_error());
        assert!(!ErrorKind::Storage.is_client_error());
    }
}
