//! # mailkey-oauth
//!
//! `OAuth2` installed-application support for mail service credentials.
//!
//! ## Features
//!
//! - **Client secrets**: Google-style `installed`/`web` client secret files
//! - **Authorization Code Flow** with PKCE and a loopback redirect listener
//! - **Credentials**: expiry checks, refresh with refresh-token preservation
//! - **Cancellation**: the interactive wait can be aborted via a `CancellationToken`
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailkey_oauth::{BrowserPrompt, ClientSecret, InstalledFlow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secret = ClientSecret::from_file("credentials.json").await?;
//!     let scopes = vec!["https://www.googleapis.com/auth/gmail.modify".to_string()];
//!
//!     let credential = InstalledFlow::new(secret.oauth_client()?, scopes)
//!         .run(&BrowserPrompt::new())
//!         .await?;
//!
//!     if credential.is_expired() {
//!         let credential = secret.oauth_client()?.refresh_credential(&credential).await?;
//!         println!("Refreshed, expires at {:?}", credential.expires_at);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod credential;
mod error;
pub mod flow;
pub mod prompt;
pub mod provider;
pub mod secret;

pub use credential::Credential;
pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, InstalledFlow, LoopbackListener, OAuthClient, PkceChallenge};
pub use prompt::{BrowserPrompt, ConsentPrompt};
pub use provider::Provider;
pub use secret::ClientSecret;
pub use tokio_util::sync::CancellationToken;
