//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigError, WalletConfig};
use crate::keyring::{Keyring, KeyringError};
use crate::ledger::HttpLedger;
use crate::messages::Response;
use crate::router::{LogSurface, Router};
use crate::storage::{self, FileVaultStore, MemorySessionStore, StorageError, VaultStore};

pub mod ledger;
pub mod wallet;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Keyring error: {0}")]
    Keyring(#[from] KeyringError),

    #[error("Vault error: {0}")]
    Vault(#[from] crate::vault::VaultError),

    #[error("{0}")]
    Operation(String),
}

/// Build a router over the file-backed vault for one CLI invocation
///
/// Every invocation is its own process, so the session store is always
/// fresh and commands that need key material unlock with the supplied
/// password first.
pub(crate) fn build_router(config: &WalletConfig) -> Result<Router, CommandError> {
    let data_dir = match &config.data_dir {
        Some(dir) => PathBuf::from(dir),
        None => storage::default_data_dir()?,
    };

    let vault_store: Arc<dyn VaultStore> = Arc::new(FileVaultStore::new(data_dir));
    let session_store = Arc::new(MemorySessionStore::new());
    let keyring = Keyring::open(vault_store, session_store)?;

    let ledger = Arc::new(HttpLedger::new(&config.ledger.rpc_url));
    Ok(Router::new(
        keyring,
        ledger,
        Arc::new(LogSurface),
        config.clone(),
    ))
}

/// Convert an `ERROR` response into a command error
pub(crate) fn expect_ok(response: Response) -> Result<Response, CommandError> {
    match response {
        Response::Error { message } => Err(CommandError::Operation(message)),
        other => Ok(other),
    }
}
