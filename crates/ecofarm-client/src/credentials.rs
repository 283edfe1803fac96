//! Client-local persistence of the scrape API key.
//!
//! The key lives in a small JSON file so it survives restarts. On Unix the
//! file is created with mode `0600`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed credentials file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("refusing to store an empty API key")]
    EmptyKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    api_key: String,
    saved_at: DateTime<Utc>,
}

/// File-backed store for a single API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored key. A missing file, or a file holding a blank key,
    /// yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Io`] if the file exists but cannot be read,
    /// or [`CredentialError::Malformed`] if it is not valid JSON.
    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredCredentials =
            serde_json::from_str(&raw).map_err(|e| CredentialError::Malformed {
                path: self.path.clone(),
                source: e,
            })?;
        let key = stored.api_key.trim().to_string();
        Ok((!key.is_empty()).then_some(key))
    }

    /// Writes `api_key`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::EmptyKey`] for a blank key, or
    /// [`CredentialError::Io`] if the file cannot be written.
    pub fn save(&self, api_key: &str) -> Result<(), CredentialError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let stored = StoredCredentials {
            api_key: api_key.to_string(),
            saved_at: Utc::now(),
        };
        let body = serde_json::to_string_pretty(&stored).map_err(|e| {
            CredentialError::Malformed {
                path: self.path.clone(),
                source: e,
            }
        })?;
        fs::write(&self.path, body).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        tracing::debug!(path = %self.path.display(), "stored API key");
        Ok(())
    }

    /// Deletes the stored key. Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Io`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> CredentialStore {
        let dir = std::env::temp_dir().join(format!("ecofarm-credentials-{}", uuid::Uuid::new_v4()));
        CredentialStore::new(dir.join("nested").join("credentials.json"))
    }

    #[test]
    fn load_missing_file_is_none() {
        let store = temp_store();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load_returns_trimmed_key() {
        let store = temp_store();
        store.save("  s3cret \n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("s3cret"));
        assert!(store.clear().unwrap());
    }

    #[test]
    fn clear_missing_file_reports_false() {
        let store = temp_store();
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn save_rejects_blank_key() {
        let store = temp_store();
        assert!(matches!(store.save("   "), Err(CredentialError::EmptyKey)));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn malformed_file_is_reported() {
        let store = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(CredentialError::Malformed { .. })));
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let store = temp_store();
        store.save("s3cret").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        store.clear().unwrap();
    }
}
