//! Vault codec: phrase generation, key derivation, and encryption
//!
//! Provides BIP39 recovery-phrase generation, SLIP-0010 Ed25519 key
//! derivation along the Solana path, and AES-GCM password-based
//! encryption of the phrase for secure storage.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

/// Vault codec errors
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("BIP39 error: {0}")]
    Bip39(String),

    #[error("Key derivation error: {0}")]
    Derivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Single opaque decryption failure.
    ///
    /// Wrong password, truncated fields, and tampered ciphertext are
    /// deliberately indistinguishable to the caller.
    #[error("invalid password or corrupted data")]
    InvalidCredentials,
}

/// PBKDF2-HMAC-SHA256 iteration count for the vault key.
///
/// Fixed constant; both encryption and decryption must agree on it.
const PBKDF2_ITERATIONS: u32 = 600_000;

/// Salt length in bytes (128 bits).
const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

/// BIP-44 purpose level.
const BIP44_PURPOSE: u32 = 44;

/// SLIP-0044 coin type for Solana.
const SOLANA_COIN_TYPE: u32 = 501;

/// The hardened index offset (0x80000000) per BIP-32/SLIP-0010.
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for SLIP-0010 Ed25519 master key generation.
const MASTER_HMAC_KEY: &[u8] = b"ed25519 seed";

/// HMAC-SHA512 type alias used throughout SLIP-0010.
type HmacSha512 = Hmac<Sha512>;

/// Generate a new recovery phrase (12 words)
///
/// Creates a 128-bit entropy BIP39 mnemonic from the operating system
/// CSPRNG. This is the wallet's master secret; it is shown to the user
/// once for backup and otherwise only ever stored encrypted.
///
/// # Example
///
/// ```ignore
/// let phrase = generate_phrase()?;
/// println!("Backup these words: {}", phrase);
/// ```
pub fn generate_phrase() -> Result<bip39::Mnemonic, VaultError> {
    // 128 bits (16 bytes) of entropy -> 12-word mnemonic
    let mut entropy = [0u8; 16];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic =
        bip39::Mnemonic::from_entropy(&entropy).map_err(|e| VaultError::Bip39(e.to_string()));
    entropy.zeroize();
    mnemonic
}

/// Ed25519 signing keypair derived from a recovery phrase
///
/// Owned by the keyring while unlocked. Never serialized and never sent
/// across the message relay; only the base58 public key leaves the core.
pub struct WalletKeypair {
    signing: SigningKey,
}

// No Clone/Debug derive: the secret half must not leak through logs or
// accidental copies.
impl std::fmt::Debug for WalletKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl WalletKeypair {
    /// Public verification key
    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Base58-encoded public key (the on-chain address)
    pub fn address(&self) -> String {
        bs58::encode(self.signing.verifying_key().to_bytes()).into_string()
    }

    /// Sign an arbitrary message with the private key
    pub fn sign(&self, message: &[u8]) -> ed25519_dalek::Signature {
        self.signing.sign(message)
    }
}

/// Derive the wallet keypair from a recovery phrase
///
/// Path: phrase -> 64-byte BIP39 seed (empty passphrase) -> SLIP-0010
/// Ed25519 hardened derivation at `m/44'/501'/{account_index}'/0'` ->
/// Ed25519 keypair. Deterministic: the same phrase and index always
/// yield the same keypair, which is the recovery mechanism. Different
/// indices yield unlinkable keypairs.
///
/// # Arguments
///
/// * `mnemonic` - BIP39 recovery phrase
/// * `account_index` - Account level of the derivation path (0 for the
///   primary account)
///
/// # Example
///
/// ```ignore
/// let keypair = derive_keypair(&phrase, 0)?;
/// println!("Address: {}", keypair.address());
/// ```
pub fn derive_keypair(
    mnemonic: &bip39::Mnemonic,
    account_index: u32,
) -> Result<WalletKeypair, VaultError> {
    if account_index >= HARDENED_OFFSET {
        return Err(VaultError::Derivation(format!(
            "account index {} exceeds maximum ({})",
            account_index,
            HARDENED_OFFSET - 1
        )));
    }

    let mut seed = mnemonic.to_seed("");

    // SLIP-0010 master key, then hardened children down the fixed path.
    let (mut key, mut chain_code) = master_key_from_seed(&seed)?;
    for index in [BIP44_PURPOSE, SOLANA_COIN_TYPE, account_index, 0] {
        let (child_key, child_chain) = derive_hardened_child(&key, &chain_code, index)?;
        key.zeroize();
        chain_code.zeroize();
        key = child_key;
        chain_code = child_chain;
    }

    let signing = SigningKey::from_bytes(&key);

    key.zeroize();
    chain_code.zeroize();
    seed.zeroize();

    Ok(WalletKeypair { signing })
}

/// Encrypted vault record
///
/// Durable at-rest form of the recovery phrase. Carries its own salt and
/// nonce so decryption is self-contained; all fields are hex-encoded
/// byte strings. Decryptable if and only if the original password is
/// supplied; any bit flip in any field makes decryption fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVault {
    /// AES-256-GCM ciphertext including the authentication tag (hex)
    pub ciphertext: String,

    /// 96-bit GCM nonce, random per encryption (hex)
    pub nonce: String,

    /// 128-bit PBKDF2 salt, random per encryption (hex)
    pub salt: String,
}

/// Encrypt a secret under a password
///
/// Derives a 256-bit key from the password with PBKDF2-HMAC-SHA256
/// (600,000 iterations, random 16-byte salt) and encrypts with
/// AES-256-GCM under a random 96-bit nonce. Nonce reuse is impossible in
/// practice: the key itself is freshly derived from a fresh salt on
/// every call.
///
/// An empty password is accepted here; password policy belongs to the
/// caller.
///
/// # Arguments
///
/// * `plaintext` - Secret bytes to protect
/// * `password` - Password the vault will be locked under
pub fn encrypt_vault(plaintext: &[u8], password: &str) -> Result<EncryptedVault, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key_bytes = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key_bytes);
    let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()));
    key_bytes.zeroize();
    let ciphertext = ciphertext?;

    Ok(EncryptedVault {
        ciphertext: hex::encode(ciphertext),
        nonce: hex::encode(nonce_bytes),
        salt: hex::encode(salt),
    })
}

/// Decrypt a vault record with a password
///
/// Re-derives the key from the stored salt and attempts authenticated
/// decryption with the stored nonce. Every failure (malformed fields,
/// wrong password, tampered ciphertext) is reported as the same opaque
/// [`VaultError::InvalidCredentials`] so the error carries no oracle
/// about which part was wrong.
///
/// # Arguments
///
/// * `vault` - Encrypted vault record (salt, nonce, ciphertext)
/// * `password` - Password the vault was locked under
pub fn decrypt_vault(vault: &EncryptedVault, password: &str) -> Result<Vec<u8>, VaultError> {
    let salt = hex::decode(&vault.salt).map_err(|_| VaultError::InvalidCredentials)?;
    let nonce_bytes = hex::decode(&vault.nonce).map_err(|_| VaultError::InvalidCredentials)?;
    let ciphertext = hex::decode(&vault.ciphertext).map_err(|_| VaultError::InvalidCredentials)?;

    if salt.len() != SALT_LEN || nonce_bytes.len() != NONCE_LEN {
        return Err(VaultError::InvalidCredentials);
    }

    let mut key_bytes = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key_bytes);
    let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);

    let nonce = Nonce::from_slice(&nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| VaultError::InvalidCredentials);
    key_bytes.zeroize();

    plaintext
}

/// Encrypt a recovery phrase for storage
///
/// Convenience wrapper around [`encrypt_vault`] for mnemonics.
pub fn encrypt_phrase(
    mnemonic: &bip39::Mnemonic,
    password: &str,
) -> Result<EncryptedVault, VaultError> {
    let mut phrase = mnemonic.to_string();
    let vault = encrypt_vault(phrase.as_bytes(), password);
    phrase.zeroize();
    vault
}

/// Decrypt and parse a recovery phrase
///
/// Convenience wrapper around [`decrypt_vault`] for mnemonics. A vault
/// that decrypts to something other than a valid phrase is reported with
/// the same opaque error as an authentication failure.
pub fn decrypt_phrase(
    vault: &EncryptedVault,
    password: &str,
) -> Result<bip39::Mnemonic, VaultError> {
    let mut plaintext = decrypt_vault(vault, password)?;

    let mnemonic = std::str::from_utf8(&plaintext)
        .ok()
        .and_then(|phrase| bip39::Mnemonic::parse(phrase).ok())
        .ok_or(VaultError::InvalidCredentials);
    plaintext.zeroize();
    mnemonic
}

/// Generates the SLIP-0010 master private key and chain code from a seed.
///
/// `I = HMAC-SHA512(key="ed25519 seed", data=seed)`
/// `IL = I[0..32]` = master key, `IR = I[32..64]` = chain code.
fn master_key_from_seed(seed: &[u8]) -> Result<([u8; 32], [u8; 32]), VaultError> {
    let i = hmac_sha512(MASTER_HMAC_KEY, seed)?;

    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&i[..32]);
    chain_code.copy_from_slice(&i[32..]);

    Ok((key, chain_code))
}

/// Derives a hardened child key from a parent key and chain code.
///
/// `I = HMAC-SHA512(key=chain_code, data=0x00 || parent_key || ser32(index | 0x80000000))`
fn derive_hardened_child(
    parent_key: &[u8; 32],
    parent_chain_code: &[u8; 32],
    index: u32,
) -> Result<([u8; 32], [u8; 32]), VaultError> {
    // data = 0x00 || parent_key (32 bytes) || index_be (4 bytes)
    let mut data = [0u8; 37];
    data[0] = 0x00;
    data[1..33].copy_from_slice(parent_key);
    data[33..37].copy_from_slice(&(index | HARDENED_OFFSET).to_be_bytes());

    let i = hmac_sha512(parent_chain_code, &data)?;
    data.zeroize();

    let mut child_key = [0u8; 32];
    let mut child_chain = [0u8; 32];
    child_key.copy_from_slice(&i[..32]);
    child_chain.copy_from_slice(&i[32..]);

    Ok((child_key, child_chain))
}

/// Computes HMAC-SHA512 and returns the 64-byte output.
fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64], VaultError> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
        .map_err(|e| VaultError::Derivation(format!("HMAC-SHA512 key init failed: {}", e)))?;
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    Ok(output)
}
