//! Error types for CSRF token handling

use http::StatusCode;
use thiserror::Error;

/// Result type for CSRF operations
pub type CsrfResult<T> = std::result::Result<T, CsrfError>;

/// CSRF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsrfError {
    /// Token missing, expired, or already consumed
    #[error("invalid token")]
    InvalidToken,

    /// Two sources carried different non-empty tokens
    #[error("inconsistent token between sources")]
    InconsistentSources,

    /// The entropy source failed while minting a token
    #[error("token generation failed: {0}")]
    GenerationFailed(String),

    /// Configuration error
    #[error("CSRF configuration error: {0}")]
    Config(String),
}

impl CsrfError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is the invalid-token error
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken)
    }

    /// Check if this error reports disagreeing sources
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::InconsistentSources)
    }

    /// HTTP status a caller would usually answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidToken | Self::InconsistentSources => StatusCode::FORBIDDEN,
            Self::GenerationFailed(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
