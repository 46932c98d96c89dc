//! Presenting the consent URL to the user.

use tracing::{info, warn};
use url::Url;

use crate::error::Result;

/// Shows the authorization URL to whoever has to approve it.
///
/// Called once per interactive flow, after the loopback listener is bound
/// and before the flow starts waiting for the redirect.
pub trait ConsentPrompt: Send + Sync {
    /// Presents `url` to the user.
    ///
    /// # Errors
    ///
    /// An error aborts the flow before any redirect is awaited.
    fn present(&self, url: &Url) -> Result<()>;
}

/// Prints the URL and opens it in the system browser.
#[derive(Debug, Clone, Copy)]
pub struct BrowserPrompt {
    open_browser: bool,
}

impl BrowserPrompt {
    /// Creates a prompt that also launches the browser.
    #[must_use]
    pub const fn new() -> Self {
        Self { open_browser: true }
    }

    /// Creates a prompt that only prints the URL (headless machines).
    #[must_use]
    pub const fn print_only() -> Self {
        Self {
            open_browser: false,
        }
    }
}

impl Default for BrowserPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentPrompt for BrowserPrompt {
    fn present(&self, url: &Url) -> Result<()> {
        eprintln!("Please visit this URL to authorize this application:\n{url}");
        if self.open_browser {
            match opener::open_browser(url.as_str()) {
                Ok(()) => info!("Opened authorization page in browser"),
                Err(e) => warn!("Could not open browser, use the printed URL instead: {e}"),
            }
        }
        Ok(())
    }
}
