//! CLI error types.

use std::fmt;

use quickadd_google::{ApiError, AuthError};

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that abort the CLI with a non-zero exit.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Credential bootstrap or authorization failed.
    Auth(AuthError),
    /// A remote calendar call failed.
    Api(ApiError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Auth(err) => write!(f, "authentication failed: {}", err),
            Self::Api(err) => write!(f, "calendar call failed: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}
