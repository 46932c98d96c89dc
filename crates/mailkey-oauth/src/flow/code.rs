//! Authorization code grant: consent URL and code exchange.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use url::Url;

use super::{OAuthClient, PkceChallenge};
use crate::credential::Credential;
use crate::error::{Error, Result};

/// Generates a random `state` value for CSRF protection.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 24] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Authorization Code Flow for `OAuth2` with PKCE.
///
/// Holds the PKCE pair between building the consent URL and exchanging the
/// code, so both halves must use the same instance.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: PkceChallenge,
}

impl AuthorizationCodeFlow {
    /// Creates a flow with a fresh PKCE pair.
    #[must_use]
    pub fn new(client: OAuthClient) -> Self {
        Self {
            client,
            pkce: PkceChallenge::generate(),
        }
    }

    /// Builds the consent URL for `scopes`, protected by `state`.
    ///
    /// Provider-specific parameters (Google's `access_type=offline`) are
    /// appended last.
    ///
    /// # Errors
    ///
    /// Returns an error if `scopes` is empty.
    pub fn authorization_url(&self, scopes: &[String], state: &str) -> Result<Url> {
        if scopes.is_empty() {
            return Err(Error::InvalidConfig("no scopes requested".into()));
        }

        let provider = &self.client.provider;
        let mut url = provider.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code");
            if let Some(redirect_uri) = &self.client.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            query
                .append_pair("scope", &scopes.join(" "))
                .append_pair("state", state)
                .append_pair("code_challenge", self.pkce.challenge())
                .append_pair("code_challenge_method", self.pkce.method())
                .extend_pairs(&provider.auth_params);
        }
        Ok(url)
    }

    /// Exchanges the code from the redirect, sending the PKCE verifier.
    ///
    /// `redirect_uri` must match the one in the consent URL. `scopes` are
    /// recorded when the server does not echo the granted scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the code or answers
    /// with something that is not a token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        scopes: &[String],
    ) -> Result<Credential> {
        self.client
            .exchange_code(code, redirect_uri, self.pkce.verifier(), scopes)
            .await
    }
}
