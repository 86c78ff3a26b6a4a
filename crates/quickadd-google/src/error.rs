//! Error types for authentication and calendar API operations.
//!
//! Two families, matching how failures are handled:
//!
//! - [`AuthError`] - the process cannot obtain a usable credential. Fatal;
//!   there is no retry.
//! - [`ApiError`] - a remote calendar call failed. Carries the remote HTTP
//!   status when one was received. Never retried automatically.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A fatal error from credential bootstrap, refresh, or authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The persisted token file exists but could not be read.
    #[error("failed to read token file {path:?}: {source}")]
    TokenRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The persisted token file exists but does not parse as a credential.
    #[error("corrupt token file {path:?}: {source}")]
    TokenParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The token file could not be written back.
    #[error("failed to write token file {path:?}: {source}")]
    TokenWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The client-secret file could not be read.
    #[error("failed to read client secret file {path:?}: {source}")]
    ClientSecretRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The client-secret file does not contain a usable client id/secret.
    #[error("invalid client secret: {0}")]
    ClientSecretInvalid(String),

    /// The refresh-token grant was rejected by the token endpoint.
    #[error("token refresh rejected: {0}")]
    RefreshRejected(String),

    /// No port in the configured range could be bound for the redirect
    /// listener.
    #[error("no available loopback port in range {0}-{1}")]
    NoLoopbackPort(u16, u16),

    /// The user denied authorization in the browser.
    #[error("authorization denied: {0}")]
    Denied(String),

    /// The interactive flow failed before a credential was obtained.
    #[error("authorization flow failed: {0}")]
    Flow(String),

    /// A request to the token endpoint could not be completed.
    #[error("token endpoint request failed: {0}")]
    TokenEndpoint(String),

    /// The token endpoint returned a body that does not parse.
    #[error("invalid token endpoint response: {0}")]
    TokenResponse(String),
}

/// The category of a calendar API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Connection failure, DNS resolution, timeout.
    Network,
    /// The access token was rejected (401).
    Authentication,
    /// The caller lacks permission for the calendar (403).
    Authorization,
    /// Rate limit exceeded (429).
    RateLimited,
    /// The server reported an error (any other non-2xx status).
    Server,
    /// The response body could not be decoded.
    InvalidResponse,
}

impl ApiErrorKind {
    /// Returns a stable, human-readable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::Authentication => "authentication_rejected",
            Self::Authorization => "access_denied",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from a remote calendar call.
///
/// The remote HTTP status is attached when a response was received; pure
/// transport failures have no status.
#[derive(Debug, Error)]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<u16>,
    message: String,
}

impl ApiError {
    /// Creates a new API error with the given kind and message.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authentication, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authorization, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    /// Attaches the remote HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns the remote HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_creation() {
        let err = ApiError::authentication("token expired");
        assert_eq!(err.kind(), ApiErrorKind::Authentication);
        assert_eq!(err.message(), "token expired");
        assert!(err.status().is_none());
    }

    #[test]
    fn api_error_with_status() {
        let err = ApiError::server("backend unavailable").with_status(503);
        assert_eq!(err.status(), Some(503));
        let display = format!("{}", err);
        assert!(display.contains("server_error"));
        assert!(display.contains("503"));
        assert!(display.contains("backend unavailable"));
    }

    #[test]
    fn api_error_display_without_status() {
        let err = ApiError::network("connection refused");
        assert_eq!(format!("{}", err), "network_error: connection refused");
    }

    #[test]
    fn kind_display() {
        assert_eq!(ApiErrorKind::RateLimited.as_str(), "rate_limited");
        assert_eq!(
            ApiErrorKind::Authentication.as_str(),
            "authentication_rejected"
        );
    }

    #[test]
    fn auth_error_display() {
        let err = AuthError::NoLoopbackPort(8080, 8090);
        assert_eq!(
            format!("{}", err),
            "no available loopback port in range 8080-8090"
        );

        let err = AuthError::RefreshRejected("invalid_grant".to_string());
        assert!(format!("{}", err).contains("invalid_grant"));
    }
}
