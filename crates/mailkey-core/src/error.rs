//! Error types for the core library.

use thiserror::Error;

use crate::config::ConfigError;
use crate::service::ServiceHandle;
use crate::store::StoreError;

/// Errors that can occur while acquiring a service handle.
#[derive(Debug, Error)]
pub enum Error {
    /// Client secret or manager settings are unusable.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Consent, code exchange, or refresh failed.
    #[error("Authorization error: {0}")]
    Authorization(#[source] mailkey_oauth::Error),

    /// The credential slot could not be read.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A new credential was obtained but could not be written to the slot.
    ///
    /// The handle is still usable for this session; the next acquisition
    /// will have to authorize again.
    #[error("Credential obtained but not saved: {source}")]
    Persist {
        /// Write failure.
        #[source]
        source: StoreError,
        /// Handle built from the unsaved credential.
        service: Box<ServiceHandle>,
    },
}

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Configuration`].
    Configuration,
    /// See [`Error::Authorization`].
    Authorization,
    /// See [`Error::Storage`] and [`Error::Persist`].
    Storage,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Storage(_) | Self::Persist { .. } => ErrorKind::Storage,
        }
    }

    /// Returns true if the consent flow was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Authorization(mailkey_oauth::Error::Cancelled))
    }

    /// Handle carried by a [`Error::Persist`] failure.
    #[must_use]
    pub fn service(&self) -> Option<&ServiceHandle> {
        match self {
            Self::Persist { service, .. } => Some(service),
            _ => None,
        }
    }

    /// Takes the handle out of a [`Error::Persist`] failure.
    #[must_use]
    pub fn into_service(self) -> Option<ServiceHandle> {
        match self {
            Self::Persist { service, .. } => Some(*service),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
