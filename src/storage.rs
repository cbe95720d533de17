//! Auth-state storage backends and key derivation
//!
//! Storage is keyed by a string derived from the backend base URL, so two
//! backend instances sharing one profile never collide. The same derived
//! string names the notification channel (see [`crate::events`]).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Prefix namespacing SDK entries away from unrelated storage
const STORAGE_KEY_PREFIX: &str = "holipoly_auth.";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error while encoding an entry
    #[error("Storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Derive the storage key (and notification channel name) for a backend.
///
/// The base URL is digested rather than embedded so the key stays
/// filesystem-safe regardless of the URL's shape.
#[must_use]
pub fn storage_key(base_url: &str) -> String {
    let digest = Sha256::digest(base_url.as_bytes());
    format!("{STORAGE_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(digest))
}

/// Key/value backend holding serialized auth state.
///
/// Implementations must be shareable across handlers: every handler built
/// over the same backing data constitutes one "context group" whose members
/// observe each other's sign-in and sign-out.
pub trait AuthStateStore: Send + Sync {
    /// Read the entry for `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the entry for `key`, replacing any previous value
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the entry for `key`; removing an absent entry is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed store - one JSON file per key under a base directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    /// Store under the platform config directory
    /// (e.g. `~/.config/holipoly-auth-sdk` on Linux)
    #[must_use]
    pub fn new() -> Self {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("holipoly-auth-sdk");

        Self { dir }
    }

    /// Store under a custom directory
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Base directory entries are written beneath
    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl AuthStateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.entry_path(key);
        std::fs::write(&path, value)?;

        // Tokens are credentials - user-only permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embeddings without durable storage.
///
/// Clones share the same map, so handlers built over clones of one store
/// observe each other's writes the way handlers over one file store do.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthStateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}
