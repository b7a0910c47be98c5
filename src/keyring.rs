//! Keyring lifecycle state machine
//!
//! In-memory holder of the decrypted recovery phrase, owned by the
//! background authority. The plaintext phrase exists in memory only
//! while the keyring is unlocked, and is mirrored to the session store
//! solely to survive background-process eviction between requests.

use std::sync::Arc;

use crate::storage::{SessionStore, StorageError, StoredVault, VaultStore};
use crate::vault::{self, VaultError, WalletKeypair};

/// Keyring errors
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no wallet found")]
    NoWalletFound,

    #[error("wallet is locked")]
    Locked,

    #[error("wallet already exists")]
    WalletExists,

    #[error("invalid recovery phrase: {0}")]
    InvalidPhrase(String),
}

/// Lifecycle state of the keyring
#[derive(Debug)]
pub enum KeyringState {
    /// No durable vault exists
    NoWallet,

    /// A vault exists but the phrase is not in memory
    Locked,

    /// The decrypted phrase is held in memory
    Unlocked(bip39::Mnemonic),
}

/// Snapshot of the keyring state for status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletStatus {
    pub has_wallet: bool,
    pub is_locked: bool,
}

/// The background authority's secret holder
///
/// Exactly one instance exists per authority. All transitions run
/// through the methods below; callers that need mutual exclusion wrap
/// the keyring in a single serialization point (see the router).
pub struct Keyring {
    state: KeyringState,
    vault_store: Arc<dyn VaultStore>,
    session_store: Arc<dyn SessionStore>,
}

impl Keyring {
    /// Open the keyring against its stores
    ///
    /// Initial state is `NoWallet` if no durable vault exists, else
    /// `Locked`. The session store is consulted lazily via
    /// [`Keyring::restore_session`], not here.
    pub fn open(
        vault_store: Arc<dyn VaultStore>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self, KeyringError> {
        let state = if vault_store.load()?.is_some() {
            KeyringState::Locked
        } else {
            KeyringState::NoWallet
        };

        Ok(Self {
            state,
            vault_store,
            session_store,
        })
    }

    /// Current status snapshot
    pub fn status(&self) -> WalletStatus {
        match &self.state {
            KeyringState::NoWallet => WalletStatus {
                has_wallet: false,
                is_locked: true,
            },
            KeyringState::Locked => WalletStatus {
                has_wallet: true,
                is_locked: true,
            },
            KeyringState::Unlocked(_) => WalletStatus {
                has_wallet: true,
                is_locked: false,
            },
        }
    }

    /// Create a wallet from a recovery phrase
    ///
    /// Encrypts the phrase under `password`, writes the durable vault,
    /// mirrors the phrase to the session store, and leaves the keyring
    /// unlocked. Only valid from `NoWallet`; an existing wallet must be
    /// reset first.
    pub fn create(&mut self, phrase: &str, password: &str) -> Result<(), KeyringError> {
        if !matches!(self.state, KeyringState::NoWallet) {
            return Err(KeyringError::WalletExists);
        }

        let mnemonic = bip39::Mnemonic::parse(phrase)
            .map_err(|e| KeyringError::InvalidPhrase(e.to_string()))?;

        let encrypted = vault::encrypt_phrase(&mnemonic, password)?;
        self.vault_store.save(&StoredVault::new(encrypted))?;
        self.session_store.save_phrase(&mnemonic.to_string())?;

        self.state = KeyringState::Unlocked(mnemonic);
        log::info!("wallet created and unlocked");
        Ok(())
    }

    /// Unlock the wallet with a password
    ///
    /// Fails with [`KeyringError::NoWalletFound`] when no durable vault
    /// exists, and with the vault codec's opaque credentials error when
    /// decryption fails, in which case the state stays `Locked`.
    pub fn unlock(&mut self, password: &str) -> Result<(), KeyringError> {
        if matches!(self.state, KeyringState::Unlocked(_)) {
            return Ok(());
        }

        let record = self.vault_store.load()?.ok_or(KeyringError::NoWalletFound)?;

        let mnemonic = vault::decrypt_phrase(&record.vault, password)?;
        self.session_store.save_phrase(&mnemonic.to_string())?;

        self.state = KeyringState::Unlocked(mnemonic);
        log::info!("wallet unlocked");
        Ok(())
    }

    /// Lock the wallet
    ///
    /// Drops the in-memory phrase and clears the session mirror.
    /// Idempotent; a keyring without a wallet stays in `NoWallet`.
    pub fn lock(&mut self) -> Result<(), KeyringError> {
        if matches!(self.state, KeyringState::NoWallet) {
            return Ok(());
        }

        self.session_store.clear()?;
        self.state = KeyringState::Locked;
        log::info!("wallet locked");
        Ok(())
    }

    /// Reset the keyring to `NoWallet`
    ///
    /// Clears the in-memory phrase, the durable vault, and the session
    /// mirror. Valid from any state.
    pub fn reset(&mut self) -> Result<(), KeyringError> {
        self.session_store.clear()?;
        self.vault_store.clear()?;
        self.state = KeyringState::NoWallet;
        log::info!("wallet reset");
        Ok(())
    }

    /// Rehydrate from the session store after a background respawn
    ///
    /// If the keyring is `Locked` and the session store still holds the
    /// phrase, repopulate memory and return to `Unlocked` without a
    /// password. Idempotent and cheap in every other state; invoked
    /// lazily before any operation that needs an unlocked keyring.
    pub fn restore_session(&mut self) -> Result<(), KeyringError> {
        if !matches!(self.state, KeyringState::Locked) {
            return Ok(());
        }

        if let Some(phrase) = self.session_store.load_phrase()? {
            match bip39::Mnemonic::parse(&phrase) {
                Ok(mnemonic) => {
                    self.state = KeyringState::Unlocked(mnemonic);
                    log::debug!("session restored, wallet unlocked");
                }
                Err(e) => {
                    // An unparseable mirror cannot unlock anything: drop it.
                    log::warn!("discarding unusable session phrase: {}", e);
                    self.session_store.clear()?;
                }
            }
        }

        Ok(())
    }

    /// Derive the signing keypair for an account index
    ///
    /// Requires `Unlocked`; reports `no wallet found` / `wallet is
    /// locked` otherwise.
    pub fn keypair(&self, account_index: u32) -> Result<WalletKeypair, KeyringError> {
        match &self.state {
            KeyringState::NoWallet => Err(KeyringError::NoWalletFound),
            KeyringState::Locked => Err(KeyringError::Locked),
            KeyringState::Unlocked(mnemonic) => {
                Ok(vault::derive_keypair(mnemonic, account_index)?)
            }
        }
    }
}
