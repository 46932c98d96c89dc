//! Error types for `OAuth2` operations.

use std::io;
use std::path::PathBuf;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// User denied authorization.
    #[error("User denied authorization")]
    AccessDenied,

    /// The redirect carried an error or lacked an authorization code.
    #[error("Authorization callback failed: {0}")]
    Callback(String),

    /// The `state` parameter of the redirect did not match the request.
    #[error("Authorization callback state mismatch")]
    StateMismatch,

    /// The consent flow was cancelled by the host application.
    #[error("Authorization cancelled")]
    Cancelled,

    /// Client secret file could not be read.
    #[error("Cannot read client secret file {}: {source}", .path.display())]
    ClientSecretRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Client secret file is not valid JSON of the expected shape.
    #[error("Cannot parse client secret file {}: {source}", .path.display())]
    ClientSecretParse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true if the authorization server rejected a grant
    /// (revoked or expired refresh token, reused code).
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth { error, .. } if error == "invalid_grant")
    }
}
