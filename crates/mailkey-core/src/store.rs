//! File-backed credential slot.
//!
//! One JSON document per slot:
//!
//! ```json
//! { "version": 1, "saved_at": "2026-01-01T00:00:00Z", "credential": { ... } }
//! ```
//!
//! Unknown versions are refused rather than guessed at.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mailkey_oauth::Credential;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Error type for credential slot operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The slot exists but could not be read.
    #[error("Cannot read credential slot {}: {source}", .path.display())]
    Read {
        /// Slot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The slot could not be written or removed.
    #[error("Cannot write credential slot {}: {source}", .path.display())]
    Write {
        /// Slot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The slot does not hold a credential document.
    #[error("Credential slot {} is corrupt (delete it to log in again): {source}", .path.display())]
    Corrupt {
        /// Slot path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The slot was written by an incompatible version.
    #[error(
        "Credential slot {} has schema version {found}, expected {expected}",
        .path.display(),
        expected = SCHEMA_VERSION
    )]
    UnsupportedVersion {
        /// Slot path.
        path: PathBuf,
        /// Version found in the file.
        found: u32,
    },

    /// The credential could not be serialized.
    #[error("Cannot encode credential: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for credential slot operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    credential: &'a Credential,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    version: u32,
    credential: serde_json::Value,
}

/// A single credential slot on disk.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store for the slot at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the slot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credential. A missing slot yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read, does not parse, or has
    /// an unsupported schema version.
    pub fn load(&self) -> StoreResult<Option<Credential>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored credential");
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let envelope: StoredEnvelope =
            serde_json::from_slice(&bytes).map_err(|source| self.corrupt(source))?;
        if envelope.version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: envelope.version,
            });
        }

        let credential =
            serde_json::from_value(envelope.credential).map_err(|source| self.corrupt(source))?;
        debug!(path = %self.path.display(), "Loaded stored credential");
        Ok(Some(credential))
    }

    /// Overwrites the slot with `credential`.
    ///
    /// Writes a sibling temporary file and renames it over the slot. On
    /// Unix the file is readable by the owner only.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, file, or rename fails.
    pub fn save(&self, credential: &Credential) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(&Envelope {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            credential,
        })?;

        let tmp = self.temp_path();
        let result = self.write_via(&tmp, &data);
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "Stored credential");
        Ok(())
    }

    /// Deletes the slot. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self) -> StoreResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted stored credential");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => {
                warn!(path = %self.path.display(), "Failed to delete credential slot: {source}");
                Err(StoreError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn write_via(&self, tmp: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(tmp, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(tmp, &self.path)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("credential"), ToOwned::to_owned);
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, source: serde_json::Error) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            source,
        }
    }
}
