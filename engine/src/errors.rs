// Error handling framework
// Console transport errors and restore engine errors

use thiserror::Error;

/// Console transport and envelope errors
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Failed to connect to director at {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Console transport failed: {0}")]
    Transport(String),

    #[error("Console protocol violation: {0}")]
    Protocol(String),

    #[error("Malformed console response: {0}")]
    MalformedResponse(String),

    #[error("Director returned an error: {message}")]
    ServerError { code: Option<i64>, message: String },
}

impl ConsoleError {
    /// True for failures of the connection itself rather than of a response
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConsoleError::Connection { .. } | ConsoleError::Transport(_)
        )
    }
}

impl RestoreError {
    /// Resolution error for a bad answer; transport failures stay fatal
    pub fn resolution(err: ConsoleError) -> Self {
        if err.is_transport() {
            RestoreError::Console(err)
        } else {
            RestoreError::ResolutionFailed(err.to_string())
        }
    }
}

/// Restore navigation and submission errors
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Invalid restore scope: {0}")]
    InvalidScope(String),

    #[error("Job id resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Restore rejected by director: {0}")]
    SubmissionRejected(String),

    #[error("Restore requires at least one job id")]
    EmptyJobIdSet,

    #[error("Invalid session transition from {from} to {to}")]
    InvalidState { from: String, to: String },

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Error report handed to front ends: a stable code plus the message
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<RestoreError> for ApiError {
    fn from(err: RestoreError) -> Self {
        let code = match &err {
            RestoreError::InvalidScope(_) | RestoreError::EmptyJobIdSet => "VALIDATION_ERROR",
            RestoreError::ResolutionFailed(_) => "RESOLUTION_FAILED",
            RestoreError::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            RestoreError::SubmissionRejected(_) => "SUBMISSION_REJECTED",
            RestoreError::InvalidState { .. } => "INVALID_STATE",
            RestoreError::Console(e) if e.is_transport() => "TRANSPORT_ERROR",
            RestoreError::Console(_) => "CONSOLE_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        RestoreError::Console(err).into()
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::Transport(err.to_string())
    }
}
