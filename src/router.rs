//! Background request router
//!
//! Maps every inbound request to a keyring/vault/ledger operation and
//! always produces exactly one response: internal failures are flattened
//! into an `ERROR` response instead of crossing the boundary. Keyring
//! mutations are serialized behind one async mutex so interleaved
//! requests can never race a lock against a half-finished unlock.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::WalletConfig;
use crate::keyring::{Keyring, KeyringError};
use crate::ledger::{self, Ledger, LedgerError};
use crate::messages::{Request, Response};
use crate::vault::WalletKeypair;

/// Surface-opener errors
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("unable to raise wallet surface: {0}")]
    Unavailable(String),
}

/// Raises the interactive wallet surface
///
/// The one thing the core may ask of the UI: open the surface, or focus
/// it if it is already open. Must be idempotent; repeated calls while a
/// surface is up focus rather than duplicate it.
pub trait SurfaceOpener: Send + Sync {
    fn open_or_focus(&self) -> Result<(), SurfaceError>;
}

/// Surface opener that only logs
///
/// Used by the CLI harness, where the operator *is* the surface.
pub struct LogSurface;

impl SurfaceOpener for LogSurface {
    fn open_or_focus(&self) -> Result<(), SurfaceError> {
        log::info!("wallet surface requested");
        Ok(())
    }
}

/// Router errors, flattened to `ERROR{message}` at the boundary
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("{0}")]
    Validation(String),

    #[error("wallet locked or setup not completed")]
    UnlockTimeout,

    #[error("dApp transaction signing is not implemented")]
    NotImplemented,
}

impl RouterError {
    fn validation(message: impl Into<String>) -> Self {
        RouterError::Validation(message.into())
    }
}

/// The background authority's dispatcher
///
/// Owns the keyring (behind the serialization mutex) and the external
/// collaborators: the ledger client and the surface opener.
pub struct Router {
    keyring: Mutex<Keyring>,
    ledger: Arc<dyn Ledger>,
    surface: Arc<dyn SurfaceOpener>,
    config: WalletConfig,
}

impl Router {
    pub fn new(
        keyring: Keyring,
        ledger: Arc<dyn Ledger>,
        surface: Arc<dyn SurfaceOpener>,
        config: WalletConfig,
    ) -> Self {
        Self {
            keyring: Mutex::new(keyring),
            ledger,
            surface,
            config,
        }
    }

    /// Handle one request, always yielding exactly one response
    ///
    /// Nothing thrown below this point escapes: every error becomes an
    /// `ERROR{message}` response so the relay can unconditionally
    /// forward whatever comes back.
    pub async fn handle(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("request failed: {}", e);
                Response::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response, RouterError> {
        match request {
            Request::GetStatus => self.status().await,
            Request::CreateWallet { phrase, password } => self.create(&phrase, &password).await,
            Request::UnlockWallet { password } => self.unlock(&password).await,
            Request::LockWallet => self.lock().await,
            Request::ResetWallet => self.reset().await,
            Request::GetBalance => self.balance().await,
            Request::SendTransaction {
                to,
                amount_major_units,
            } => self.send_transaction(&to, amount_major_units).await,
            Request::GetTransactions => self.transactions().await,
            Request::SignMessage { message_bytes } => self.sign_message(&message_bytes).await,
            Request::ConnectDapp { origin } => self.connect_dapp(&origin).await,
            Request::SignTransactionDapp { origin, .. } => {
                log::info!("rejecting dApp transaction signing request from {}", origin);
                Err(RouterError::NotImplemented)
            }
        }
    }

    async fn status(&self) -> Result<Response, RouterError> {
        let mut keyring = self.keyring.lock().await;
        keyring.restore_session()?;

        let status = keyring.status();
        Ok(Response::Status {
            has_wallet: status.has_wallet,
            is_locked: status.is_locked,
        })
    }

    async fn create(&self, phrase: &str, password: &str) -> Result<Response, RouterError> {
        if password.is_empty() {
            return Err(RouterError::validation("password is required"));
        }
        if phrase.trim().is_empty() {
            return Err(RouterError::validation("recovery phrase is required"));
        }

        let mut keyring = self.keyring.lock().await;
        keyring.restore_session()?;
        keyring.create(phrase, password)?;
        Ok(Response::Success)
    }

    async fn unlock(&self, password: &str) -> Result<Response, RouterError> {
        if password.is_empty() {
            return Err(RouterError::validation("password is required"));
        }

        let mut keyring = self.keyring.lock().await;
        keyring.restore_session()?;
        keyring.unlock(password)?;
        Ok(Response::Success)
    }

    async fn lock(&self) -> Result<Response, RouterError> {
        let mut keyring = self.keyring.lock().await;
        keyring.lock()?;
        Ok(Response::Success)
    }

    async fn reset(&self) -> Result<Response, RouterError> {
        let mut keyring = self.keyring.lock().await;
        keyring.reset()?;
        Ok(Response::Success)
    }

    async fn balance(&self) -> Result<Response, RouterError> {
        let keypair = self.unlocked_keypair().await?;
        let address = keypair.address();

        let lamports = self.ledger.balance(&address).await?;
        Ok(Response::Balance {
            amount: ledger::lamports_to_sol(lamports),
            public_key_text: address,
        })
    }

    async fn send_transaction(&self, to: &str, amount: f64) -> Result<Response, RouterError> {
        if to.trim().is_empty() {
            return Err(RouterError::validation("recipient is required"));
        }
        let lamports = ledger::sol_to_lamports(amount)?;

        let keypair = self.unlocked_keypair().await?;
        let signature = self.ledger.submit_transfer(&keypair, to, lamports).await?;

        log::info!("transfer submitted: {}", signature);
        Ok(Response::Signed { signature })
    }

    async fn transactions(&self) -> Result<Response, RouterError> {
        let keypair = self.unlocked_keypair().await?;
        let list = self.ledger.recent_transactions(&keypair.address()).await?;
        Ok(Response::Transactions { list })
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Response, RouterError> {
        if message.is_empty() {
            return Err(RouterError::validation("message is required"));
        }

        let keypair = self.unlocked_keypair().await?;
        let signature = keypair.sign(message);
        Ok(Response::Signed {
            signature: bs58::encode(signature.to_bytes()).into_string(),
        })
    }

    /// dApp connection handshake
    ///
    /// Connected immediately when the keyring is already unlocked.
    /// Otherwise the interactive surface is raised (idempotently) and
    /// the keyring is polled at a fixed interval, re-attempting session
    /// restore each cycle; a concurrent caller's unlock is the
    /// expected success path. The wait is bounded: after
    /// `max_poll_attempts` cycles the handshake terminates with a
    /// timeout error and the keyring is left in whatever state it is in.
    async fn connect_dapp(&self, origin: &str) -> Result<Response, RouterError> {
        log::info!("dApp connect requested by {}", origin);

        if let Some(response) = self.try_connect().await? {
            return Ok(response);
        }

        self.surface.open_or_focus()?;

        let interval = self.config.connect.poll_interval();
        for _ in 0..self.config.connect.max_poll_attempts {
            tokio::time::sleep(interval).await;

            if let Some(response) = self.try_connect().await? {
                return Ok(response);
            }
        }

        log::warn!("dApp connect from {} timed out waiting for unlock", origin);
        Err(RouterError::UnlockTimeout)
    }

    /// One connect poll cycle: rehydrate, then answer if unlocked
    async fn try_connect(&self) -> Result<Option<Response>, RouterError> {
        let mut keyring = self.keyring.lock().await;
        keyring.restore_session()?;

        if keyring.status().is_locked {
            return Ok(None);
        }

        let keypair = keyring.keypair(self.config.account_index)?;
        Ok(Some(Response::Connected {
            public_key_text: keypair.address(),
        }))
    }

    /// Rehydrate lazily, then derive the signing keypair
    ///
    /// The shared preamble of every operation that needs an unlocked
    /// keyring; fails with the keyring's `no wallet found` / `wallet is
    /// locked` errors otherwise. The lock is released before any ledger
    /// round trip so slow RPC never starves other requests.
    async fn unlocked_keypair(&self) -> Result<WalletKeypair, RouterError> {
        let mut keyring = self.keyring.lock().await;
        keyring.restore_session()?;
        Ok(keyring.keypair(self.config.account_index)?)
    }
}
