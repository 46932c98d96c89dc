//! `OAuth2` credential types and validity checks.

use std::fmt;

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the recorded expiry at which a credential stops being usable.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Access credential granted by an authorization server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time. `None` means the server gave no lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scopes granted by the authorization server.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Creates a new credential.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scopes: Vec::new(),
        }
    }

    /// Creates a credential from a token endpoint response.
    ///
    /// `requested_scopes` is recorded when the response does not list the
    /// granted scopes itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no access token.
    pub fn from_response(response: TokenResponse, requested_scopes: &[String]) -> Result<Self> {
        if response.access_token.trim().is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));

        let scopes = response.scope.as_deref().map_or_else(
            || requested_scopes.to_vec(),
            |s| s.split_whitespace().map(str::to_string).collect(),
        );

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            scopes,
        })
    }

    /// Returns true if both the access token and token type are present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.token_type.trim().is_empty()
    }

    /// Checks if the credential is expired at `now` (with 60 second buffer).
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    /// Checks if the credential is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the credential is well-formed and unexpired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_well_formed() && !self.is_expired_at(now)
    }

    /// Returns true if the credential can be used right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Returns true if a non-empty refresh token is present.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if the granted scopes are exactly `scopes`, ignoring order.
    #[must_use]
    pub fn has_scopes(&self, scopes: &[String]) -> bool {
        let mut granted: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let mut wanted: Vec<&str> = scopes.iter().map(String::as_str).collect();
        granted.sort_unstable();
        granted.dedup();
        wanted.sort_unstable();
        wanted.dedup();
        granted == wanted
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the refresh token if available.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::NoRefreshToken)
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Token response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space separated scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Error response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(scope: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "test_token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: Some("refresh".to_string()),
            scope: scope.map(str::to_string),
        }
    }

    #[test]
    fn test_credential_creation() {
        let credential = Credential::new("access123", "Bearer");
        assert_eq!(credential.access_token, "access123");
        assert_eq!(credential.token_type, "Bearer");
        assert!(credential.expires_at.is_none());
        assert!(credential.refresh_token.is_none());
        assert!(credential.is_valid());
    }

    #[test]
    fn test_credential_expiration() {
        let now = Utc::now();
        let expired =
            Credential::new("access123", "Bearer").with_expires_at(now - Duration::seconds(120));
        assert!(expired.is_expired_at(now));
        assert!(!expired.is_valid_at(now));

        let valid =
            Credential::new("access123", "Bearer").with_expires_at(now + Duration::seconds(3600));
        assert!(!valid.is_expired_at(now));
        assert!(valid.is_valid_at(now));
    }

    #[test]
    fn test_expiry_skew() {
        let now = Utc::now();
        let almost =
            Credential::new("access123", "Bearer").with_expires_at(now + Duration::seconds(30));
        assert!(almost.is_expired_at(now));
    }

    #[test]
    fn test_malformed_credential_is_invalid() {
        let credential = Credential::new("", "Bearer");
        assert!(!credential.is_well_formed());
        assert!(!credential.is_valid());

        let credential = Credential::new("access", " ");
        assert!(!credential.is_valid());
    }

    #[test]
    fn test_refresh_token_accessors() {
        let credential = Credential::new("a", "Bearer");
        assert!(!credential.can_refresh());
        assert!(matches!(credential.refresh_token(), Err(Error::NoRefreshToken)));

        let credential = credential.with_refresh_token("refresh456");
        assert!(credential.can_refresh());
        assert_eq!(credential.refresh_token().unwrap(), "refresh456");

        let credential = Credential::new("a", "Bearer").with_refresh_token("");
        assert!(!credential.can_refresh());
    }

    #[test]
    fn test_from_response_with_scope() {
        let credential = Credential::from_response(
            response(Some("https://mail.google.com/ email")),
            &["ignored".to_string()],
        )
        .unwrap();
        assert_eq!(credential.access_token, "test_token");
        assert!(credential.expires_at.is_some());
        assert!(credential.is_valid());
        assert_eq!(credential.scopes, vec!["https://mail.google.com/", "email"]);
    }

    #[test]
    fn test_from_response_falls_back_to_requested_scopes() {
        let requested = vec!["scope-a".to_string()];
        let credential = Credential::from_response(response(None), &requested).unwrap();
        assert_eq!(credential.scopes, requested);
    }

    #[test]
    fn test_from_response_rejects_empty_access_token() {
        let mut resp = response(None);
        resp.access_token = String::new();
        assert!(matches!(
            Credential::from_response(resp, &[]),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_has_scopes_ignores_order() {
        let credential = Credential::new("a", "Bearer").with_scopes(["b", "a"]);
        assert!(credential.has_scopes(&["a".to_string(), "b".to_string()]));
        assert!(!credential.has_scopes(&["a".to_string()]));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential =
            Credential::new("secret-access", "Bearer").with_refresh_token("secret-refresh");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let resp: TokenResponse = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(resp.token_type, "Bearer");
    }
}
