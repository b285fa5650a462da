//! Error types for the enhancement service.

use thiserror::Error;

/// Result type alias using the service's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Caller Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    // =========================================================================
    // Hard Dependency Errors
    // =========================================================================
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    // =========================================================================
    // Soft Dependency Errors
    // =========================================================================
    #[error("Technique selection failed: {0}")]
    TechniqueSelection(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Transport & Runtime Errors
    // =========================================================================
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stable, machine-checkable error category surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    Dependency,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// Wire code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Dependency => "dependency_error",
            Self::Timeout => "timeout",
            Self::Internal => "internal_error",
        }
    }
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an access denied error.
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Create a classification error.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a generation error.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a technique selection error.
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::TechniqueSelection(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a backend transport error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Category used for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Classification(_)
            | Self::Generation(_)
            | Self::TechniqueSelection(_)
            | Self::Cache(_)
            | Self::Storage(_)
            | Self::Backend(_) => ErrorKind::Dependency,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Config(_) | Self::Serialization(_) | Self::Internal(_) | Self::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message safe to return to an untrusted caller.
    ///
    /// Validation, not-found and access errors carry caller-facing text.
    /// Everything else collapses to a generic description so collaborator
    /// internals never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) | Self::NotFound(msg) | Self::AccessDenied(msg) => {
                msg.clone()
            }
            Self::Classification(_) => "intent classification failed".to_string(),
            Self::Generation(_) => "prompt generation failed".to_string(),
            Self::Timeout(_) => "request deadline exceeded".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}
