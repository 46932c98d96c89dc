//! Installed-application flow: consent in the browser, code on loopback.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{AuthorizationCodeFlow, LoopbackListener, OAuthClient, generate_state};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::prompt::ConsentPrompt;

/// Default address the loopback listener binds to.
pub const DEFAULT_LOOPBACK_HOST: &str = "127.0.0.1";

/// Interactive authorization for desktop and command-line applications.
///
/// Binds a loopback listener, sends the user to the consent page with a
/// redirect back to that listener, and exchanges the returned code. Waits
/// without a timeout; cancel the token to abort.
#[derive(Debug)]
pub struct InstalledFlow {
    client: OAuthClient,
    scopes: Vec<String>,
    loopback_host: String,
    cancel: CancellationToken,
}

impl InstalledFlow {
    /// Creates a flow requesting `scopes`.
    #[must_use]
    pub fn new(client: OAuthClient, scopes: Vec<String>) -> Self {
        Self {
            client,
            scopes,
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the address the loopback listener binds to.
    #[must_use]
    pub fn with_loopback_host(mut self, host: impl Into<String>) -> Self {
        self.loopback_host = host.into();
        self
    }

    /// Uses `cancel` to abort the wait for the redirect.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the flow to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token is cancelled while waiting,
    /// [`Error::AccessDenied`] if the user declines, and any listener,
    /// callback, or token endpoint error otherwise.
    pub async fn run(self, prompt: &dyn ConsentPrompt) -> Result<Credential> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let listener = LoopbackListener::bind(&self.loopback_host).await?;
        let redirect_uri = listener.redirect_uri().to_string();

        let flow = AuthorizationCodeFlow::new(self.client.with_redirect_uri(&redirect_uri));
        let state = generate_state();
        let url = flow.authorization_url(&self.scopes, &state)?;

        prompt.present(&url)?;
        info!("Waiting for authorization redirect on {redirect_uri}");

        let code = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!("Authorization cancelled while waiting for redirect");
                return Err(Error::Cancelled);
            }
            code = listener.wait_for_code(&state) => code?,
        };

        debug!("Authorization code received");
        flow.exchange_code(&code, Some(&redirect_uri), &self.scopes)
            .await
    }
}
