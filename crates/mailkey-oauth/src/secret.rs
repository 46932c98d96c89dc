//! Client secret files for installed applications.
//!
//! Providers hand out a JSON document describing the application identity.
//! Google's format wraps the fields in an `installed` (desktop apps) or
//! `web` object:
//!
//! ```json
//! {
//!   "installed": {
//!     "client_id": "1234.apps.googleusercontent.com",
//!     "client_secret": "...",
//!     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
//!     "token_uri": "https://oauth2.googleapis.com/token",
//!     "redirect_uris": ["http://localhost"]
//!   }
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use crate::provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, Provider};

/// Application identity loaded from a client secret file.
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    /// Client ID issued by the provider.
    pub client_id: String,
    /// Client secret (installed apps get one too, but it is not confidential).
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Provider-side project identifier.
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Reads and validates a client secret file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, not in the
    /// expected format, or lists invalid endpoints.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| Error::ClientSecretRead {
                    path: path.to_path_buf(),
                    source,
                })?;

        let secret = Self::from_json(&contents).map_err(|e| match e {
            Error::Json(source) => Error::ClientSecretParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        debug!(
            path = %path.display(),
            project = secret.project_id.as_deref().unwrap_or("-"),
            "Loaded client secret"
        );
        Ok(secret)
    }

    /// Parses a client secret document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, has neither an `installed`
    /// nor a `web` section, or fails validation.
    pub fn from_json(contents: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(contents)?;
        let secret = file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig(
                "client secret has neither an \"installed\" nor a \"web\" section".into(),
            )
        })?;
        secret.validate()?;
        Ok(secret)
    }

    /// Checks the identity fields and endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if `client_id` is empty or an endpoint is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }
        self.provider()?.validate()
    }

    /// Builds the provider described by this secret's endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL cannot be parsed.
    pub fn provider(&self) -> Result<Provider> {
        let provider = Provider::new("Custom", &self.auth_uri, &self.token_uri)?;
        if provider.is_google() {
            Provider::google(&self.auth_uri, &self.token_uri)
        } else {
            Ok(provider)
        }
    }

    /// Builds an `OAuth2` client for this application.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL cannot be parsed.
    pub fn oauth_client(&self) -> Result<OAuthClient> {
        let mut client = OAuthClient::new(&self.client_id, self.provider()?);
        if let Some(secret) = self.client_secret.as_deref().filter(|s| !s.is_empty()) {
            client = client.with_client_secret(secret);
        }
        Ok(client)
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "demo",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "s3cret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_parse_installed() {
        let secret = ClientSecret::from_json(INSTALLED).unwrap();
        assert_eq!(secret.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(secret.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(secret.redirect_uris, vec!["http://localhost"]);
        assert!(secret.provider().unwrap().is_google());
    }

    #[test]
    fn test_parse_web_section() {
        let secret =
            ClientSecret::from_json(r#"{"web": {"client_id": "abc", "client_secret": "x"}}"#)
                .unwrap();
        assert_eq!(secret.client_id, "abc");
        assert_eq!(secret.token_uri, GOOGLE_TOKEN_URL);
    }

    #[test]
    fn test_missing_section() {
        assert!(matches!(
            ClientSecret::from_json(r#"{"other": {}}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_client_id() {
        assert!(matches!(
            ClientSecret::from_json(r#"{"installed": {"client_id": " "}}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_custom_endpoints_are_not_google() {
        let secret = ClientSecret::from_json(
            r#"{"installed": {"client_id": "abc",
                "auth_uri": "http://127.0.0.1:9999/auth",
                "token_uri": "http://127.0.0.1:9999/token"}}"#,
        )
        .unwrap();
        let provider = secret.provider().unwrap();
        assert!(!provider.is_google());
        assert_eq!(provider.token_url.as_str(), "http://127.0.0.1:9999/token");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = ClientSecret::from_json(INSTALLED).unwrap();
        assert!(!format!("{secret:?}").contains("s3cret"));
    }

    #[tokio::test]
    async fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientSecret::from_file(dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ClientSecretRead { .. }));
    }

    #[tokio::test]
    async fn test_from_file_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ClientSecret::from_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::ClientSecretParse { .. }));
    }

    #[tokio::test]
    async fn test_from_file_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, INSTALLED).unwrap();
        let secret = ClientSecret::from_file(&path).await.unwrap();
        let client = secret.oauth_client().unwrap();
        assert_eq!(client.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(client.client_secret.as_deref(), Some("s3cret"));
    }
}
