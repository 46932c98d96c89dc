//! `OAuth2` authorization flows.

mod code;
mod installed;
mod loopback;
mod pkce;

pub use code::{AuthorizationCodeFlow, generate_state};
pub use installed::{DEFAULT_LOOPBACK_HOST, InstalledFlow};
pub use loopback::LoopbackListener;
pub use pkce::PkceChallenge;

use crate::credential::{Credential, ErrorResponse, TokenResponse};
use crate::error::{Error, Result};
use crate::provider::Provider;
use reqwest::Client;
use tracing::debug;

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Refreshes a credential using its refresh token.
    ///
    /// The refreshed credential keeps the old refresh token and scopes when
    /// the server does not return new ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the credential has no refresh token.
    pub async fn refresh_credential(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_token()?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];

        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!(provider = %self.provider.name, "Refreshing access token");
        let token_response = self.request_token(&params).await?;
        let mut refreshed = Credential::from_response(token_response, &credential.scopes)?;

        // Preserve refresh token if not returned
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token.clone_from(&credential.refresh_token);
        }

        Ok(refreshed)
    }

    /// Exchanges an authorization code for a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: &str,
        requested_scopes: &[String],
    ) -> Result<Credential> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.push(("redirect_uri", uri));
        }

        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        debug!(provider = %self.provider.name, "Exchanging authorization code");
        let token_response = self.request_token(&params).await?;
        Credential::from_response(token_response, requested_scopes)
    }

    /// Posts a form to the token endpoint and decodes the response.
    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::InvalidResponse(format!("token endpoint returned {status}")),
                ErrorResponse::into_error,
            ));
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
    use chrono::{Duration, Utc};

    fn client_for(server: &mockito::ServerGuard) -> OAuthClient {
        let provider = Provider::new(
            "Test",
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        )
        .unwrap();
        OAuthClient::new("test_client_id", provider).with_client_secret("secret")
    }

    fn expired() -> Credential {
        Credential::new("old", "Bearer")
            .with_expires_at(Utc::now() - Duration::seconds(10))
            .with_refresh_token("refresh-1")
            .with_scopes(["scope-a"])
    }

    #[test]
    fn test_oauth_client_creation() {
        let provider = Provider::google(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL).unwrap();
        let client = OAuthClient::new("test_client_id", provider);
        assert_eq!(client.client_id, "test_client_id");
        assert!(client.client_secret.is_none());
    }

    #[test]
    fn test_oauth_client_with_secret() {
        let provider = Provider::google(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL).unwrap();
        let client = OAuthClient::new("test_client_id", provider)
            .with_client_secret("secret")
            .with_redirect_uri("http://127.0.0.1:8080/");

        assert_eq!(client.client_secret.as_deref(), Some("secret"));
        assert_eq!(client.redirect_uri.as_deref(), Some("http://127.0.0.1:8080/"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_and_scopes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
                mockito::Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"new","token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let refreshed = client_for(&server)
            .refresh_credential(&expired())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(refreshed.scopes, vec!["scope-a"]);
        assert!(refreshed.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"invalid_grant","error_description":"Token has been revoked."}"#,
            )
            .create_async()
            .await;

        let err = client_for(&server)
            .refresh_credential(&expired())
            .await
            .unwrap_err();
        assert!(err.is_invalid_grant());
    }

    #[tokio::test]
    async fn test_refresh_non_json_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = client_for(&server)
            .refresh_credential(&expired())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_refresh_malformed_success_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .refresh_credential(&expired())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let server = mockito::Server::new_async().await;
        let credential = Credential::new("old", "Bearer");
        let err = client_for(&server)
            .refresh_credential(&credential)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
    }
}
