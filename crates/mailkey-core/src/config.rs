//! Credential manager configuration.

use std::path::PathBuf;

use mailkey_oauth::flow::DEFAULT_LOOPBACK_HOST;
use url::Url;

/// Default client secret file, relative to the working directory.
pub const DEFAULT_CLIENT_SECRET_PATH: &str = "credentials.json";

/// Default credential slot, relative to the working directory.
pub const DEFAULT_SLOT_PATH: &str = "credentials/token.json";

/// Scope requested when none is configured explicitly.
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Errors in the manager configuration or the client secret it points at.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The scope set is empty.
    #[error("At least one scope is required")]
    NoScopes,

    /// A scope identifier is blank.
    #[error("Scope identifiers must not be blank")]
    BlankScope,

    /// The service root URL does not parse.
    #[error("Invalid service URL {url}: {source}")]
    ServiceUrl {
        /// Offending URL.
        url: String,
        /// Parse error.
        #[source]
        source: url::ParseError,
    },

    /// The client secret file is missing or invalid.
    #[error(transparent)]
    ClientSecret(#[from] mailkey_oauth::Error),
}

/// Remote service the returned handle talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Service name (e.g., "gmail").
    pub name: String,
    /// API version (e.g., "v1").
    pub version: String,
    /// Root URL the name and version are appended to.
    pub root_url: String,
}

impl ServiceSpec {
    /// Creates a service description.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        root_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            root_url: root_url.into(),
        }
    }

    /// Gmail API v1.
    #[must_use]
    pub fn gmail() -> Self {
        Self::new("gmail", "v1", "https://gmail.googleapis.com/")
    }

    /// Returns `<root>/<name>/<version>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root URL is invalid.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |source| ConfigError::ServiceUrl {
            url: self.root_url.clone(),
            source,
        };
        let mut root = self.root_url.clone();
        if !root.ends_with('/') {
            root.push('/');
        }
        Url::parse(&root)
            .and_then(|url| url.join(&format!("{}/{}/", self.name, self.version)))
            .map_err(invalid)
    }
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self::gmail()
    }
}

/// Settings for one credential lifecycle.
///
/// Each manager owns exactly one slot and one scope set. Change the scopes
/// only after clearing the slot; cached credentials are not reconciled.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Client secret file.
    pub client_secret_path: PathBuf,
    /// Credential slot file.
    pub slot_path: PathBuf,
    /// Scopes requested during consent.
    pub scopes: Vec<String>,
    /// Service the returned handle is bound to.
    pub service: ServiceSpec,
    /// Address the consent redirect listener binds to.
    pub loopback_host: String,
}

impl ManagerConfig {
    /// Creates a configuration with the default slot and service.
    #[must_use]
    pub fn new<I, S>(client_secret_path: impl Into<PathBuf>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_secret_path: client_secret_path.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the credential slot file.
    #[must_use]
    pub fn with_slot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.slot_path = path.into();
        self
    }

    /// Replaces the scope set.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the service the handle is bound to.
    #[must_use]
    pub fn with_service(mut self, service: ServiceSpec) -> Self {
        self.service = service;
        self
    }

    /// Sets the loopback listener address.
    #[must_use]
    pub fn with_loopback_host(mut self, host: impl Into<String>) -> Self {
        self.loopback_host = host.into();
        self
    }

    /// Checks scopes and the service URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope set is empty or blank, or the service
    /// URL is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scopes.is_empty() {
            return Err(ConfigError::NoScopes);
        }
        if self.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::BlankScope);
        }
        self.service.base_url()?;
        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            client_secret_path: PathBuf::from(DEFAULT_CLIENT_SECRET_PATH),
            slot_path: PathBuf::from(DEFAULT_SLOT_PATH),
            scopes: vec![GMAIL_MODIFY_SCOPE.to_string()],
            service: ServiceSpec::gmail(),
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
        }
    }
}
