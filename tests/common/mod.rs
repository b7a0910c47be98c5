//! Shared test helpers
//!
//! In-memory stores, a scriptable mock ledger, a counting surface
//! opener, and router construction with fast connect-poll settings.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vandal_wallet::config::{Cluster, ConnectSettings, LedgerConfig, WalletConfig};
use vandal_wallet::keyring::Keyring;
use vandal_wallet::ledger::{Ledger, LedgerError, TransactionRecord};
use vandal_wallet::router::{Router, SurfaceError, SurfaceOpener};
use vandal_wallet::storage::{MemorySessionStore, MemoryVaultStore, SessionStore, VaultStore};
use vandal_wallet::vault::WalletKeypair;

/// Valid BIP39 test phrase (the standard test vector)
pub const TEST_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// A second, distinct valid phrase
pub const OTHER_PHRASE: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

/// Initialize env_logger once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scriptable ledger stand-in
///
/// Serves a configurable balance and history, records submitted
/// transfers, and can be told to fail or stall the next call.
pub struct MockLedger {
    lamports: Mutex<u64>,
    records: Mutex<Vec<TransactionRecord>>,
    transfers: Mutex<Vec<(String, u64)>>,
    fail_with: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lamports: Mutex::new(0),
            records: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            delay: Mutex::new(None),
        })
    }

    pub fn set_balance(&self, lamports: u64) {
        *self.lamports.lock().unwrap() = lamports;
    }

    pub fn set_records(&self, records: Vec<TransactionRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Make every following call fail with this message
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    /// Stall every following call by this much
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Transfers submitted so far as (recipient, lamports)
    pub fn transfers(&self) -> Vec<(String, u64)> {
        self.transfers.lock().unwrap().clone()
    }

    async fn checkpoint(&self) -> Result<(), LedgerError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.fail_with.lock().unwrap().clone() {
            Some(message) => Err(LedgerError::Rpc(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn balance(&self, _address: &str) -> Result<u64, LedgerError> {
        self.checkpoint().await?;
        Ok(*self.lamports.lock().unwrap())
    }

    async fn submit_transfer(
        &self,
        _from: &WalletKeypair,
        to: &str,
        lamports: u64,
    ) -> Result<String, LedgerError> {
        self.checkpoint().await?;
        self.transfers.lock().unwrap().push((to.to_string(), lamports));
        Ok(format!("MockSig{}", self.transfers.lock().unwrap().len()))
    }

    async fn recent_transactions(
        &self,
        _address: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.checkpoint().await?;
        Ok(self.records.lock().unwrap().clone())
    }
}

/// Surface opener that counts raises
#[derive(Default)]
pub struct MockSurface {
    opens: AtomicUsize,
}

impl MockSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl SurfaceOpener for MockSurface {
    fn open_or_focus(&self) -> Result<(), SurfaceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Config with connect polling tightened for tests (10ms x 5 attempts)
pub fn test_config() -> WalletConfig {
    WalletConfig {
        ledger: LedgerConfig {
            cluster: Cluster::Devnet,
            rpc_url: "http://localhost:8899".to_string(),
        },
        account_index: 0,
        connect: ConnectSettings {
            poll_interval_ms: 10,
            max_poll_attempts: 5,
        },
        data_dir: None,
    }
}

/// Store pair shared across simulated background respawns
pub struct TestStores {
    pub vault: Arc<MemoryVaultStore>,
    pub session: Arc<MemorySessionStore>,
}

impl TestStores {
    pub fn new() -> Self {
        Self {
            vault: Arc::new(MemoryVaultStore::new()),
            session: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Open a keyring over these stores, as a fresh background would
    pub fn open_keyring(&self) -> Keyring {
        let vault: Arc<dyn VaultStore> = self.vault.clone();
        let session: Arc<dyn SessionStore> = self.session.clone();
        Keyring::open(vault, session).expect("keyring should open")
    }
}

/// Router over fresh in-memory stores and the given collaborators
pub fn build_router(
    stores: &TestStores,
    ledger: Arc<MockLedger>,
    surface: Arc<MockSurface>,
) -> Router {
    Router::new(stores.open_keyring(), ledger, surface, test_config())
}
