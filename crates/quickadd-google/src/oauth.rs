//! OAuth 2.0 flows against Google's authorization and token endpoints.
//!
//! Two grants are used:
//!
//! - Authorization code with PKCE (RFC 7636) and a loopback redirect, for
//!   the interactive flow. The listener accepts only localhost connections,
//!   a random state parameter guards the redirect, and the wait for the
//!   user's grant is unbounded - it ends with the callback, a denial, or
//!   process death.
//! - Refresh token, for renewing an expired access token.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::config::OAuthCredentials;
use crate::error::AuthError;
use crate::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// PKCE code verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// Client for Google's OAuth endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
        }
    }

    /// Runs the interactive authorization flow and returns the obtained
    /// tokens.
    ///
    /// Binds a loopback listener, opens the user's browser to the consent
    /// page, blocks until the redirect delivers an authorization code, and
    /// exchanges the code for tokens. The user grants or denies access
    /// out-of-band; there is no enforced timeout on the wait.
    ///
    /// # Errors
    ///
    /// Fails when no loopback port can be bound, the user denies access,
    /// the redirect is malformed, or the token exchange is rejected.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> Result<TokenInfo, AuthError> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting authorization flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        // The listener is owned by the callback thread and closed when the
        // thread ends, on every path out of this function.
        let (code, received_state) = Self::wait_for_callback(listener)?;

        if received_state != pkce.state {
            return Err(AuthError::Flow(
                "state mismatch on redirect - possible CSRF".to_string(),
            ));
        }

        info!("received authorization code, exchanging for tokens");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Renews an access token with the refresh-token grant.
    ///
    /// Returns the new access token and its lifetime in seconds. The caller
    /// keeps the existing refresh token and scope set.
    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<(String, Option<i64>), AuthError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenEndpoint(format!("refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenEndpoint(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AuthError::RefreshRejected(format!("({}) {}", status, body)));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenResponse(e.to_string()))?;

        info!("refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<TokenInfo, AuthError> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenEndpoint(format!("token exchange failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenEndpoint(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AuthError::Flow(format!(
                "token exchange rejected ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenResponse(e.to_string()))?;

        info!("obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Binds a TCP listener on the first available port in the range.
    fn bind_loopback(port_range: (u16, u16)) -> Result<(TcpListener, u16), AuthError> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!("bound redirect listener on port {}", port);
                return Ok((listener, port));
            }
        }
        Err(AuthError::NoLoopbackPort(port_range.0, port_range.1))
    }

    /// Blocks until the redirect delivers an authorization code.
    ///
    /// Returns the code and the echoed state parameter.
    fn wait_for_callback(listener: TcpListener) -> Result<(String, String), AuthError> {
        let (tx, rx) = mpsc::channel();

        // The listener moves into the thread; browsers often probe with
        // extra connections (favicon requests), so keep accepting until a
        // recognizable callback arrives.
        let _handle = thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = Self::handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        match rx.recv() {
            Ok(result) => result,
            Err(_) => Err(AuthError::Flow("callback listener ended".to_string())),
        }
    }

    /// Handles one connection on the redirect listener.
    ///
    /// Returns `None` for requests that are not the callback, so the accept
    /// loop keeps waiting.
    fn handle_callback(mut stream: TcpStream) -> Option<Result<(String, String), AuthError>> {
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();

        if reader.read_line(&mut request_line).is_err() {
            return None;
        }

        // Request line: GET /callback?code=...&state=... HTTP/1.1
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 || parts[0] != "GET" {
            return None;
        }

        let path = parts[1];
        if !path.starts_with("/callback") {
            return None;
        }

        let query = path.find('?').map(|i| &path[i + 1..]).unwrap_or("");

        let mut code = None;
        let mut state = None;
        let mut denial = None;

        for param in query.split('&') {
            let mut kv = param.splitn(2, '=');
            if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
                let value = urlencoding::decode(value).unwrap_or_default().into_owned();
                match key {
                    "code" => code = Some(value),
                    "state" => state = Some(value),
                    "error" => denial = Some(value),
                    _ => {}
                }
            }
        }

        let response = if denial.is_some() || code.is_none() {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        } else {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization complete</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        };

        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        if let Some(denial) = denial {
            return Some(Err(AuthError::Denied(denial)));
        }

        match (code, state) {
            (Some(c), Some(s)) => Some(Ok((c, s))),
            (Some(c), None) => Some(Ok((c, String::new()))),
            _ => Some(Err(AuthError::Flow(
                "missing authorization code in redirect".to_string(),
            ))),
        }
    }
}

/// PKCE verifier/challenge pair and CSRF state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state echoed back on the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new flow with a random verifier and state.
    pub fn new() -> Self {
        let verifier = random_urlsafe(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_urlsafe(16);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the S256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the authorization URL.
    ///
    /// `access_type=offline` and `prompt=consent` make Google return a
    /// refresh token on every new authorization.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates `len` random bytes, base64url encoded without padding.
fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response body from the token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
