//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Extra query parameters appended to the authorization URL.
    pub auth_params: Vec<(String, String)>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            auth_params: Vec::new(),
        })
    }

    /// Adds an extra authorization URL parameter.
    #[must_use]
    pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_params.push((key.into(), value.into()));
        self
    }

    /// Google provider with the endpoints listed in a client secret file.
    ///
    /// Requests offline access with a forced consent screen so the first
    /// consent always yields a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google(
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self::new("Google", auth_url, token_url)?
            .with_auth_param("access_type", "offline")
            .with_auth_param("prompt", "consent"))
    }

    /// Returns true if the authorization endpoint is hosted by Google.
    #[must_use]
    pub fn is_google(&self) -> bool {
        self.auth_url
            .host_str()
            .is_some_and(|host| host == "google.com" || host.ends_with(".google.com"))
    }

    /// Validates that required URLs are set.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "{label} must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_google_provider() {
        let provider = Provider::google(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL).unwrap();
        assert_eq!(provider.name, "Google");
        assert!(provider.is_google());
        assert_eq!(
            provider.auth_params,
            vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ]
        );
        provider.validate().unwrap();
    }

    #[test]
    fn test_custom_provider() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();

        assert_eq!(provider.name, "Custom");
        assert!(!provider.is_google());
        assert!(provider.auth_params.is_empty());
        provider.validate().unwrap();
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let provider = Provider::new(
            "Custom",
            "ftp://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();
        assert!(matches!(provider.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            Provider::new("Bad", "not a url", "https://auth.example.com/token"),
            Err(Error::UrlError(_))
        ));
    }
}
