//! # mailkey-core
//!
//! Credential lifecycle for Google mail APIs.
//!
//! This crate provides:
//! - **Credential manager** - cached, refreshed, or interactively authorized
//!   credentials, persisted in a single slot
//! - **Credential slot** - versioned JSON file with owner-only permissions
//! - **Service handles** - bearer-authenticated HTTP clients bound to one
//!   service name and API version
//!
//! ```ignore
//! use mailkey_core::{CredentialManager, ManagerConfig, GMAIL_MODIFY_SCOPE};
//!
//! let config = ManagerConfig::new("credentials.json", [GMAIL_MODIFY_SCOPE]);
//! let gmail = CredentialManager::new(config).acquire_service().await?;
//! let labels = gmail
//!     .request(reqwest::Method::GET, "users/me/labels")?
//!     .send()
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod manager;
pub mod service;
pub mod store;

pub use config::{
    ConfigError, DEFAULT_CLIENT_SECRET_PATH, DEFAULT_SLOT_PATH, GMAIL_MODIFY_SCOPE,
    ManagerConfig, ServiceSpec,
};
pub use error::{Error, ErrorKind, Result};
pub use mailkey_oauth::{BrowserPrompt, CancellationToken, ConsentPrompt, Credential};
pub use manager::{CredentialManager, acquire_service};
pub use service::ServiceHandle;
pub use store::{CredentialStore, SCHEMA_VERSION, StoreError, StoreResult};
