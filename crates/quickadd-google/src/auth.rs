//! Token lifecycle: produce a valid credential with the minimum work.
//!
//! [`Authenticator::obtain`] is the single entry point. Depending on what is
//! stored it does nothing, runs the refresh-token grant, or drives the
//! interactive authorization flow. Every path that changes the credential
//! persists it before returning.

use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::OAuthClient;
use crate::tokens::{CredentialState, TokenInfo, TokenStore};

/// Produces a valid credential for the current process.
pub struct Authenticator {
    config: AuthConfig,
    store: TokenStore,
    oauth: OAuthClient,
}

impl Authenticator {
    /// Creates an authenticator from an immutable configuration.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;

        let store = TokenStore::new(&config.token_path);
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout);

        Ok(Self {
            config,
            store,
            oauth,
        })
    }

    /// Returns a credential whose access token is unexpired and whose scope
    /// set covers the configured scopes.
    ///
    /// A stored valid credential is returned without any network call. An
    /// expired credential with a refresh token goes through the
    /// refresh-token grant; when the grant fails (network error, revoked
    /// token) the flow falls back to interactive authorization rather than
    /// giving up. Anything else - no credential, no refresh token, or a
    /// scope set that no longer covers the configured scopes - drives the
    /// interactive flow directly.
    ///
    /// # Errors
    ///
    /// Fails when the stored credential file is unreadable or corrupt, or
    /// when the interactive flow cannot produce a credential. Authorization
    /// failure is fatal for the invocation; nothing is retried.
    pub async fn obtain(&self) -> Result<TokenInfo, AuthError> {
        let stored = self.store.load()?;
        let state = CredentialState::of(stored.as_ref(), &self.config.scopes);

        match (state, stored) {
            (CredentialState::Valid, Some(tokens)) => {
                debug!("stored credential is valid, no network call needed");
                Ok(tokens)
            }
            (CredentialState::ExpiredRefreshable, Some(mut tokens)) => {
                let Some(refresh_token) = tokens.refresh_token.clone() else {
                    return self.authorize_interactive().await;
                };

                debug!("access token expired, attempting refresh");
                match self.oauth.refresh(&refresh_token).await {
                    Ok((access_token, expires_in)) => {
                        tokens.update_access_token(access_token, expires_in);
                        self.store.save(&tokens)?;
                        Ok(tokens)
                    }
                    Err(e) => {
                        warn!("refresh failed, re-authorizing interactively: {}", e);
                        self.authorize_interactive().await
                    }
                }
            }
            (CredentialState::Absent, _) => {
                info!("no stored credential, starting interactive authorization");
                self.authorize_interactive().await
            }
            (CredentialState::ExpiredUnrefreshable, _) | (_, None) => {
                info!("stored credential is unusable, starting interactive authorization");
                self.authorize_interactive().await
            }
        }
    }

    /// Runs the interactive flow and persists the result.
    async fn authorize_interactive(&self) -> Result<TokenInfo, AuthError> {
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        self.store.save(&tokens)?;
        Ok(tokens)
    }

    /// Returns the path of the persisted credential file.
    pub fn token_path(&self) -> &std::path::Path {
        self.store.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthCredentials;

    fn test_config(token_path: &std::path::Path) -> AuthConfig {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        AuthConfig::new(credentials, token_path)
    }

    #[test]
    fn rejects_invalid_credentials() {
        let credentials = OAuthCredentials::new("not-a-google-client-id", "secret");
        let config = AuthConfig::new(credentials, "/tmp/token.json");
        assert!(Authenticator::new(config).is_err());
    }

    #[tokio::test]
    async fn obtain_returns_stored_valid_credential_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let token_path = tmp.path().join("token.json");
        let config = test_config(&token_path);

        let stored = TokenInfo::new(
            "stored-access-token",
            Some("stored-refresh-token".to_string()),
            Some(3600),
            config.scopes.clone(),
        );
        TokenStore::new(&token_path).save(&stored).unwrap();

        // A valid stored credential must come back as-is; any other path
        // would hit the network or the browser and fail this test.
        let auth = Authenticator::new(config).unwrap();
        let obtained = auth.obtain().await.unwrap();
        assert_eq!(obtained.access_token, "stored-access-token");
        assert_eq!(
            obtained.refresh_token,
            Some("stored-refresh-token".to_string())
        );
    }

    #[tokio::test]
    async fn obtain_fails_on_corrupt_token_file() {
        let tmp = tempfile::tempdir().unwrap();
        let token_path = tmp.path().join("token.json");
        std::fs::write(&token_path, "{ not json").unwrap();

        let auth = Authenticator::new(test_config(&token_path)).unwrap();
        let result = auth.obtain().await;
        assert!(matches!(result, Err(AuthError::TokenParse { .. })));
    }
}
