//! OAuth client configuration.
//!
//! The client id/secret pair is provisioned out-of-band in Google's standard
//! client-secret JSON layout and loaded once per process. [`AuthConfig`]
//! bundles it with the scope set and token path; the whole value is immutable
//! after construction and handed to the token lifecycle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AuthError;

/// OAuth 2.0 client identity for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's client-secret JSON file.
///
/// Supports the Google Cloud Console format with an "installed" or "web"
/// section, and the flat format with client_id/client_secret at root level.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google client-secret JSON file.
    ///
    /// This is the file downloaded from the Google Cloud Console OAuth 2.0
    /// credentials page.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AuthError::ClientSecretRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a client-secret JSON string.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| AuthError::ClientSecretInvalid(format!("failed to parse JSON: {}", e)))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(AuthError::ClientSecretInvalid(
            "expected an 'installed'/'web' section or 'client_id'/'client_secret' at root level"
                .to_string(),
        ))
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the token lifecycle.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client identity.
    pub credentials: OAuthCredentials,

    /// Scopes to request and to require of a stored credential.
    pub scopes: Vec<String>,

    /// Where the obtained credential is persisted.
    pub token_path: PathBuf,

    /// Request timeout for token endpoint calls.
    pub timeout: Duration,

    /// Port range to try for the loopback redirect listener.
    pub loopback_port_range: (u16, u16),
}

impl AuthConfig {
    /// Default timeout in seconds for token endpoint calls.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Scope granting read access to calendar events.
    pub const READ_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Scope granting write access to calendar events.
    pub const WRITE_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.events";

    /// Creates a configuration with the required scope set for this program:
    /// read and write access to calendar events.
    pub fn new(credentials: OAuthCredentials, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            scopes: vec![Self::READ_SCOPE.to_string(), Self::WRITE_SCOPE.to_string()],
            token_path: token_path.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for the redirect listener.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), AuthError> {
        self.credentials
            .validate()
            .map_err(|e| AuthError::ClientSecretInvalid(e.to_string()))?;

        if self.scopes.is_empty() {
            return Err(AuthError::ClientSecretInvalid(
                "at least one OAuth scope is required".to_string(),
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(AuthError::Flow("invalid loopback port range".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());

        let empty_id = OAuthCredentials::new("", "secret");
        assert!(empty_id.validate().is_err());

        let bad_id = OAuthCredentials::new("bad-id", "secret");
        assert!(bad_id.validate().is_err());

        let empty_secret = OAuthCredentials::new("test.apps.googleusercontent.com", "");
        assert!(empty_secret.validate().is_err());
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let result = OAuthCredentials::from_json(r#"{ "other": {} }"#);
        assert!(result.is_err());
    }

    #[test]
    fn credentials_from_json_malformed() {
        let result = OAuthCredentials::from_json("not json");
        assert!(matches!(result, Err(AuthError::ClientSecretInvalid(_))));
    }

    #[test]
    fn credentials_from_missing_file() {
        let result = OAuthCredentials::from_file("/nonexistent/credentials.json");
        assert!(matches!(result, Err(AuthError::ClientSecretRead { .. })));
    }

    #[test]
    fn config_default_scopes() {
        let config = AuthConfig::new(test_credentials(), "/tmp/token.json");
        assert_eq!(
            config.scopes,
            vec![
                AuthConfig::READ_SCOPE.to_string(),
                AuthConfig::WRITE_SCOPE.to_string()
            ]
        );
    }

    #[test]
    fn config_validation() {
        let config = AuthConfig::new(test_credentials(), "/tmp/token.json");
        assert!(config.validate().is_ok());

        let mut bad = AuthConfig::new(test_credentials(), "/tmp/token.json");
        bad.scopes.clear();
        assert!(bad.validate().is_err());

        let bad_range = AuthConfig::new(test_credentials(), "/tmp/token.json")
            .with_loopback_port_range(9010, 9000);
        assert!(bad_range.validate().is_err());
    }

    #[test]
    fn config_builder_methods() {
        let config = AuthConfig::new(test_credentials(), "/tmp/token.json")
            .with_timeout(Duration::from_secs(60))
            .with_loopback_port_range(9000, 9010);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.loopback_port_range, (9000, 9010));
    }
}
