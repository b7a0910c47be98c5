//! Vault persistence
//!
//! Two stores back the keyring: a durable store holding the encrypted
//! vault record (survives restarts) and a session store holding the
//! plaintext phrase only for the lifetime of the browsing session, so a
//! transient background restart does not force a password re-prompt.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::vault::EncryptedVault;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirectoryNotFound,
}

/// Durable vault record
///
/// What gets written to disk. Only the encrypted vault itself plus
/// non-sensitive metadata; the plaintext phrase never reaches this
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVault {
    /// Encrypted recovery phrase (salt, nonce, ciphertext)
    pub vault: EncryptedVault,

    /// When the wallet was created
    pub created_at: DateTime<Utc>,
}

impl StoredVault {
    /// Wrap a freshly encrypted vault for storage
    pub fn new(vault: EncryptedVault) -> Self {
        Self {
            vault,
            created_at: Utc::now(),
        }
    }
}

/// Durable store for the encrypted vault
///
/// One record per wallet; survives process restarts.
pub trait VaultStore: Send + Sync {
    /// Load the stored vault, if any
    fn load(&self) -> Result<Option<StoredVault>, StorageError>;

    /// Persist the vault record, replacing any previous one
    fn save(&self, record: &StoredVault) -> Result<(), StorageError>;

    /// Remove the vault record
    fn clear(&self) -> Result<(), StorageError>;
}

/// Session-scoped store for the plaintext phrase
///
/// Mirrors the phrase only while the wallet is unlocked, so the keyring
/// can be rehydrated after the background process is evicted and
/// respawned. Never backed by durable media; does not survive a full
/// restart of the host.
pub trait SessionStore: Send + Sync {
    /// Load the mirrored phrase, if any
    fn load_phrase(&self) -> Result<Option<String>, StorageError>;

    /// Mirror the phrase for the rest of the session
    fn save_phrase(&self, phrase: &str) -> Result<(), StorageError>;

    /// Drop the mirrored phrase
    fn clear(&self) -> Result<(), StorageError>;
}

/// Get the default data directory path
///
/// Returns: `~/.vandal-wallet/`
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    dirs::home_dir()
        .map(|home| home.join(".vandal-wallet"))
        .ok_or(StorageError::DataDirectoryNotFound)
}

/// File-backed durable vault store
///
/// Persists the record as pretty-printed JSON at `<data_dir>/vault.json`.
pub struct FileVaultStore {
    path: PathBuf,
}

impl FileVaultStore {
    /// Store rooted at a specific data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join("vault.json"),
        }
    }

    /// Store rooted at the default data directory
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(default_data_dir()?))
    }
}

impl VaultStore for FileVaultStore {
    fn load(&self) -> Result<Option<StoredVault>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        let record: StoredVault = serde_json::from_str(&json)?;
        Ok(Some(record))
    }

    fn save(&self, record: &StoredVault) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory durable-store stand-in for tests
#[derive(Default)]
pub struct MemoryVaultStore {
    record: RwLock<Option<StoredVault>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryVaultStore {
    fn load(&self) -> Result<Option<StoredVault>, StorageError> {
        let guard = self
            .record
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, record: &StoredVault) -> Result<(), StorageError> {
        let mut guard = self
            .record
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .record
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

/// In-memory session store
///
/// The production session store: lives for the host session, outliving
/// any single keyring instance, and is dropped with the process.
#[derive(Default)]
pub struct MemorySessionStore {
    phrase: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load_phrase(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .phrase
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save_phrase(&self, phrase: &str) -> Result<(), StorageError> {
        let mut guard = self
            .phrase
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(phrase.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .phrase
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(mut phrase) = guard.take() {
            phrase.zeroize();
        }
        Ok(())
    }
}
