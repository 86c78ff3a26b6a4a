//! Persisted OAuth credential and its lifecycle state.
//!
//! The credential file stores the access token, optional refresh token,
//! expiry, and granted scopes as JSON. [`CredentialState`] classifies a
//! stored credential so the lifecycle can perform the minimum work: use it,
//! refresh it, or start over with a new authorization.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// An OAuth token set with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token attached to API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a new token set from token endpoint response data.
    ///
    /// The expiry is pulled in by a minute so a token is refreshed slightly
    /// before the server-side deadline.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(Self::expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    fn expiry_from_now(secs: i64) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without a recorded expiry are treated as valid.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Returns true if the granted scopes are a superset of `required`.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh, keeping the refresh token
    /// and scope set.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(Self::expiry_from_now);
        self.last_refresh = Utc::now();
    }
}

/// Lifecycle state of a stored credential.
///
/// `Valid` is the only state from which a remote calendar call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No credential is stored.
    Absent,
    /// The access token is unexpired and covers the required scopes.
    Valid,
    /// The access token is expired but a refresh token is present.
    ExpiredRefreshable,
    /// The credential cannot be made usable without a new authorization:
    /// expired with no refresh token, or granted scopes that no longer cover
    /// the required set (a refresh cannot widen scopes).
    ExpiredUnrefreshable,
}

impl CredentialState {
    /// Classifies a stored credential against the required scope set.
    pub fn of(tokens: Option<&TokenInfo>, required_scopes: &[String]) -> Self {
        let Some(tokens) = tokens else {
            return Self::Absent;
        };

        if !tokens.has_scopes(required_scopes) {
            return Self::ExpiredUnrefreshable;
        }

        if !tokens.is_expired() {
            Self::Valid
        } else if tokens.refresh_token.is_some() {
            Self::ExpiredRefreshable
        } else {
            Self::ExpiredUnrefreshable
        }
    }
}

/// File-backed credential store.
///
/// The credential is stored as JSON. Writes go through a temp file and a
/// rename, and the file is restricted to the owner on Unix.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credential.
    ///
    /// A missing file is `Ok(None)` - first runs have no credential. An
    /// unreadable or corrupt file is an error: the process cannot tell what
    /// state the credential is in and must not guess.
    pub fn load(&self) -> Result<Option<TokenInfo>, AuthError> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| AuthError::TokenRead {
            path: self.path.clone(),
            source: e,
        })?;

        let tokens: TokenInfo =
            serde_json::from_str(&content).map_err(|e| AuthError::TokenParse {
                path: self.path.clone(),
                source: e,
            })?;

        debug!("loaded tokens from {:?}", self.path);
        Ok(Some(tokens))
    }

    /// Persists the credential, replacing any previous contents.
    pub fn save(&self, tokens: &TokenInfo) -> Result<(), AuthError> {
        let write_err = |e| AuthError::TokenWrite {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| AuthError::TokenResponse(format!("failed to serialize tokens: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }
}
