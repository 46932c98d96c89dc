//! Authenticated handle for one remote service.

use mailkey_oauth::Credential;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use crate::config::ServiceSpec;
use crate::error::{Error, Result};

/// Client for one service name and API version, authorized by a valid
/// credential.
///
/// Every request built through [`ServiceHandle::request`] carries the
/// credential as a bearer token. The handle does not refresh; acquire a new
/// one from the manager when the credential expires.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    name: String,
    version: String,
    base_url: Url,
    credential: Credential,
    http_client: Client,
}

impl ServiceHandle {
    /// Builds a handle for `spec` from a credential that is valid now.
    ///
    /// # Errors
    ///
    /// Returns an authorization error if the credential is expired or
    /// malformed, and a configuration error if the service URL is invalid.
    pub fn new(spec: &ServiceSpec, credential: Credential) -> Result<Self> {
        if !credential.is_valid() {
            return Err(Error::Authorization(
                mailkey_oauth::Error::InvalidResponse(
                    "credential is expired or malformed".into(),
                ),
            ));
        }
        Self::build(spec, credential)
    }

    /// Builds a handle from a credential the token endpoint just issued.
    ///
    /// The expiry skew is not applied: a short-lived token is still usable
    /// right after it was granted.
    pub(crate) fn from_issued(spec: &ServiceSpec, credential: Credential) -> Result<Self> {
        if !credential.is_well_formed() {
            return Err(Error::Authorization(
                mailkey_oauth::Error::InvalidResponse("issued credential is malformed".into()),
            ));
        }
        Self::build(spec, credential)
    }

    fn build(spec: &ServiceSpec, credential: Credential) -> Result<Self> {
        let base_url = spec.base_url()?;

        let mut auth = HeaderValue::try_from(format!(
            "{} {}",
            credential.token_type, credential.access_token
        ))
        .map_err(|_| {
            Error::Authorization(mailkey_oauth::Error::InvalidResponse(
                "access token contains characters not allowed in a header".into(),
            ))
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http_client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Authorization(e.into()))?;

        Ok(Self {
            name: spec.name.clone(),
            version: spec.version.clone(),
            base_url,
            credential,
            http_client,
        })
    }

    /// Service name (e.g., "gmail").
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// API version (e.g., "v1").
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Base URL all endpoint paths are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credential this handle was built from.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Access token sent with each request.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.credential.access_token
    }

    /// Scopes granted to the credential.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.credential.scopes
    }

    /// Authorized HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Resolves `path` (e.g., `users/me/labels`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }

    /// Starts an authorized request to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn request(
        &self,
        method: Method,
        path: &str,
    ) -> std::result::Result<RequestBuilder, url::ParseError> {
        Ok(self.http_client.request(method, self.endpoint(path)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn valid() -> Credential {
        Credential::new("ya29.token", "Bearer")
            .with_expires_at(Utc::now() + Duration::seconds(3600))
            .with_scopes(["scope-a"])
    }

    #[test]
    fn test_handle_exposes_service_and_credential() {
        let handle = ServiceHandle::new(&ServiceSpec::gmail(), valid()).unwrap();
        assert_eq!(handle.name(), "gmail");
        assert_eq!(handle.version(), "v1");
        assert_eq!(handle.access_token(), "ya29.token");
        assert_eq!(handle.scopes(), ["scope-a".to_string()]);
        assert_eq!(
            handle.endpoint("/users/me/labels").unwrap().as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/labels"
        );
    }

    #[test]
    fn test_expired_credential_rejected() {
        let expired = Credential::new("old", "Bearer")
            .with_expires_at(Utc::now() - Duration::seconds(1));
        let err = ServiceHandle::new(&ServiceSpec::gmail(), expired).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn test_short_lived_issued_credential_accepted() {
        let short = Credential::new("ya29.short", "Bearer")
            .with_expires_at(Utc::now() + Duration::seconds(45));
        assert!(ServiceHandle::new(&ServiceSpec::gmail(), short.clone()).is_err());

        let handle = ServiceHandle::from_issued(&ServiceSpec::gmail(), short).unwrap();
        assert_eq!(handle.access_token(), "ya29.short");
    }

    #[test]
    fn test_malformed_issued_credential_rejected() {
        let blank = Credential::new("", "Bearer");
        let err = ServiceHandle::from_issued(&ServiceSpec::gmail(), blank).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn test_header_unsafe_token_rejected() {
        let credential = Credential::new("bad\ntoken", "Bearer");
        let err = ServiceHandle::new(&ServiceSpec::gmail(), credential).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_requests_carry_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/profile")
            .match_header("authorization", "Bearer ya29.token")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let spec = ServiceSpec::new("gmail", "v1", server.url());
        let handle = ServiceHandle::new(&spec, valid()).unwrap();
        let status = handle
            .request(Method::GET, "users/me/profile")
            .unwrap()
            .send()
            .await
            .unwrap()
            .status();

        assert!(status.is_success());
        mock.assert_async().await;
    }
}
