//! Integration tests for the keyring state machine
//!
//! Lifecycle transitions, unlock scenarios, and session restore across
//! a simulated background respawn.

mod common;

use common::{TestStores, OTHER_PHRASE, TEST_PHRASE};
use vandal_wallet::keyring::KeyringError;
use vandal_wallet::storage::{SessionStore, VaultStore};

#[test]
fn create_unlocks_and_persists_the_vault() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    assert!(!keyring.status().has_wallet);

    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");

    let status = keyring.status();
    assert!(status.has_wallet);
    assert!(!status.is_locked);

    // Durable vault written, phrase mirrored to the session store
    assert!(stores.vault.load().unwrap().is_some());
    assert_eq!(
        stores.session.load_phrase().unwrap().as_deref(),
        Some(TEST_PHRASE)
    );
}

#[test]
fn create_is_rejected_when_a_wallet_exists() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");

    let result = keyring.create(OTHER_PHRASE, "pw2");
    assert!(matches!(result, Err(KeyringError::WalletExists)));
}

#[test]
fn create_rejects_an_invalid_phrase() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    let result = keyring.create("definitely not a bip39 phrase", "pw1");
    assert!(matches!(result, Err(KeyringError::InvalidPhrase(_))));
    assert!(!keyring.status().has_wallet);
}

#[test]
fn lock_is_idempotent_and_clears_the_session() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.lock().expect("lock should succeed");
    keyring.lock().expect("second lock should succeed");

    let status = keyring.status();
    assert!(status.has_wallet);
    assert!(status.is_locked);
    assert!(stores.session.load_phrase().unwrap().is_none());
}

#[test]
fn wrong_password_unlock_stays_locked() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.lock().expect("lock should succeed");

    let result = keyring.unlock("pw2");
    assert_eq!(
        result.unwrap_err().to_string(),
        "invalid password or corrupted data"
    );
    assert!(keyring.status().is_locked);
}

#[test]
fn correct_unlock_restores_the_same_key() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    let address_after_create = keyring.keypair(0).unwrap().address();

    keyring.lock().expect("lock should succeed");
    keyring.unlock("pw1").expect("unlock should succeed");

    let address_after_unlock = keyring.keypair(0).unwrap().address();
    assert_eq!(address_after_create, address_after_unlock);
}

#[test]
fn unlock_without_a_vault_reports_no_wallet() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    let result = keyring.unlock("pw1");
    assert!(matches!(&result, Err(KeyringError::NoWalletFound)));
    assert_eq!(result.unwrap_err().to_string(), "no wallet found");
}

#[test]
fn reset_always_lands_on_no_wallet() {
    // From unlocked
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();
    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.reset().expect("reset should succeed");
    assert!(!keyring.status().has_wallet);
    assert!(stores.vault.load().unwrap().is_none());
    assert!(stores.session.load_phrase().unwrap().is_none());

    // From locked
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();
    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.lock().expect("lock should succeed");
    keyring.reset().expect("reset should succeed");
    assert!(!keyring.status().has_wallet);

    // From no wallet (no-op)
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();
    keyring.reset().expect("reset should succeed");
    assert!(!keyring.status().has_wallet);
}

#[test]
fn session_restore_survives_a_background_respawn() {
    let stores = TestStores::new();

    // First background instance creates the wallet
    let mut keyring = stores.open_keyring();
    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    let address = keyring.keypair(0).unwrap().address();
    drop(keyring);

    // Respawned instance starts locked, then rehydrates without a password
    let mut respawned = stores.open_keyring();
    assert!(respawned.status().is_locked);

    respawned.restore_session().expect("restore should succeed");
    let status = respawned.status();
    assert!(status.has_wallet);
    assert!(!status.is_locked);
    assert_eq!(respawned.keypair(0).unwrap().address(), address);
}

#[test]
fn locked_wallet_stays_locked_across_respawn() {
    let stores = TestStores::new();

    let mut keyring = stores.open_keyring();
    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.lock().expect("lock should succeed");
    drop(keyring);

    // Lock cleared the session mirror, so restore finds nothing
    let mut respawned = stores.open_keyring();
    respawned.restore_session().expect("restore should succeed");
    assert!(respawned.status().is_locked);
}

#[test]
fn keypair_requires_an_unlocked_keyring() {
    let stores = TestStores::new();
    let mut keyring = stores.open_keyring();

    // No wallet at all
    assert!(matches!(
        keyring.keypair(0),
        Err(KeyringError::NoWalletFound)
    ));

    // Locked
    keyring.create(TEST_PHRASE, "pw1").expect("create should succeed");
    keyring.lock().expect("lock should succeed");
    let result = keyring.keypair(0);
    assert!(matches!(&result, Err(KeyringError::Locked)));
    assert_eq!(result.unwrap_err().to_string(), "wallet is locked");
}
