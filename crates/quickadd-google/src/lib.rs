//! Google Calendar access for the quickadd CLI.
//!
//! This crate covers the two halves of talking to Google Calendar:
//!
//! - The OAuth 2.0 token lifecycle: [`Authenticator::obtain`] returns a
//!   valid credential, doing the minimum work - a stored credential is used
//!   as-is, an expired one is refreshed, and only when neither works does
//!   the interactive browser flow run (PKCE with a loopback redirect).
//! - The calendar operations: [`CalendarClient`] lists upcoming events and
//!   creates events from free text via the quickAdd endpoint.
//!
//! # Example
//!
//! ```ignore
//! use quickadd_google::{AuthConfig, Authenticator, CalendarClient, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let config = AuthConfig::new(credentials, "token.json");
//! let timeout = config.timeout;
//!
//! let tokens = Authenticator::new(config)?.obtain().await?;
//! let client = CalendarClient::new(&tokens.access_token, timeout);
//!
//! for event in client.list_upcoming("primary", 10).await? {
//!     println!("{} {}", event.start, event.summary);
//! }
//! let created = client.quick_add("primary", "Dinner tomorrow at 10").await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod tokens;

pub use auth::Authenticator;
pub use client::{CalendarClient, Event, EventStart};
pub use config::{AuthConfig, OAuthCredentials};
pub use error::{ApiError, ApiErrorKind, AuthError};
pub use oauth::{OAuthClient, PkceFlow};
pub use tokens::{CredentialState, TokenInfo, TokenStore};
