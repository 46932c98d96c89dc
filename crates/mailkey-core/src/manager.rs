//! Credential lifecycle: cached, refreshed, or newly authorized.

use std::fmt;
use std::path::Path;

use mailkey_oauth::{
    BrowserPrompt, CancellationToken, ClientSecret, ConsentPrompt, Credential, InstalledFlow,
    OAuthClient,
};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ManagerConfig};
use crate::error::{Error, Result};
use crate::service::ServiceHandle;
use crate::store::CredentialStore;

/// Produces authenticated service handles from one credential slot.
///
/// Each call to [`CredentialManager::acquire_service`] resolves a valid
/// credential in order of cost:
///
/// 1. the cached credential, if it is still valid (no network, no write);
/// 2. a refresh of the cached credential, if it carries a refresh token;
/// 3. the interactive consent flow.
///
/// Newly obtained credentials overwrite the slot. A failed refresh is
/// reported as-is; the manager never falls back to consent on its own.
pub struct CredentialManager {
    config: ManagerConfig,
    store: CredentialStore,
    prompt: Box<dyn ConsentPrompt>,
    cancel: CancellationToken,
}

impl CredentialManager {
    /// Creates a manager that opens consent pages in the system browser.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let store = CredentialStore::new(&config.slot_path);
        Self {
            config,
            store,
            prompt: Box::new(BrowserPrompt::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces how the consent URL is presented.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl ConsentPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    /// Uses `cancel` to abort a pending consent flow.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts a pending consent flow when cancelled.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Manager configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns a handle backed by a valid credential.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if the scopes or client secret are unusable.
    ///   Nothing else is touched in that case.
    /// - [`Error::Storage`] if the slot exists but cannot be read.
    /// - [`Error::Authorization`] if refresh or consent fails, including
    ///   cancellation. The slot is left as it was.
    /// - [`Error::Persist`] if a new credential could not be saved; the error
    ///   still carries a usable handle.
    pub async fn acquire_service(&self) -> Result<ServiceHandle> {
        let client = self.oauth_client().await?;

        let cached = self.store.load()?;
        if let Some(credential) = &cached
            && !credential.has_scopes(&self.config.scopes)
        {
            warn!(
                path = %self.store.path().display(),
                cached = ?credential.scopes,
                configured = ?self.config.scopes,
                "Cached credential scopes differ from the configured scopes; \
                 delete the slot to re-authorize"
            );
        }

        match cached {
            Some(credential) if credential.is_valid() => {
                debug!("Using cached credential");
                ServiceHandle::new(&self.config.service, credential)
            }
            Some(credential) if credential.can_refresh() => {
                info!("Cached credential expired, refreshing");
                let refreshed = client
                    .refresh_credential(&credential)
                    .await
                    .map_err(Error::Authorization)?;
                self.persist_and_build(refreshed)
            }
            cached => {
                if cached.is_some() {
                    info!("Cached credential expired and cannot be refreshed, authorizing again");
                } else {
                    info!("No cached credential, starting authorization");
                }
                let credential = InstalledFlow::new(client, self.config.scopes.clone())
                    .with_loopback_host(&self.config.loopback_host)
                    .with_cancellation(self.cancel.clone())
                    .run(&*self.prompt)
                    .await
                    .map_err(Error::Authorization)?;
                info!("Authorization complete");
                self.persist_and_build(credential)
            }
        }
    }

    /// Reads the slot without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the slot exists but cannot be read.
    pub fn cached_credential(&self) -> Result<Option<Credential>> {
        Ok(self.store.load()?)
    }

    /// Deletes the slot. Returns whether a credential was removed.
    ///
    /// Required before changing the configured scopes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the slot cannot be removed.
    pub fn forget(&self) -> Result<bool> {
        let removed = self.store.delete()?;
        if removed {
            info!(path = %self.store.path().display(), "Removed cached credential");
        }
        Ok(removed)
    }

    async fn oauth_client(&self) -> Result<OAuthClient> {
        self.config.validate()?;
        let secret = ClientSecret::from_file(&self.config.client_secret_path)
            .await
            .map_err(ConfigError::from)?;
        debug!(
            path = %self.config.client_secret_path.display(),
            client_id = %secret.client_id,
            "Loaded client secret"
        );
        secret
            .oauth_client()
            .map_err(|e| Error::Configuration(e.into()))
    }

    fn persist_and_build(&self, credential: Credential) -> Result<ServiceHandle> {
        let service = ServiceHandle::from_issued(&self.config.service, credential)?;
        if let Err(source) = self.store.save(service.credential()) {
            warn!(
                path = %self.store.path().display(),
                "Failed to save credential: {source}"
            );
            return Err(Error::Persist {
                source,
                service: Box::new(service),
            });
        }
        Ok(service)
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Acquires a handle for the default service and slot.
///
/// Shorthand for [`CredentialManager::acquire_service`] with
/// [`ManagerConfig::new`].
///
/// # Errors
///
/// See [`CredentialManager::acquire_service`].
pub async fn acquire_service(
    client_secret_path: impl AsRef<Path>,
    scopes: &[&str],
) -> Result<ServiceHandle> {
    let config = ManagerConfig::new(client_secret_path.as_ref(), scopes.iter().copied());
    CredentialManager::new(config).acquire_service().await
}
