//! Integration tests for the vault codec
//!
//! Phrase generation entropy, derivation determinism, encryption
//! round-trips, and tamper sensitivity of every vault field.

use bip39::Mnemonic;
use vandal_wallet::vault::{
    decrypt_phrase, decrypt_vault, derive_keypair, encrypt_phrase, encrypt_vault, generate_phrase,
    EncryptedVault, VaultError,
};

/// Flip one bit inside a hex-encoded field
fn flip_bit(field: &str, bit: usize) -> String {
    let mut bytes = hex::decode(field).expect("field should be valid hex");
    bytes[bit / 8] ^= 1 << (bit % 8);
    hex::encode(bytes)
}

#[test]
fn generated_phrases_are_valid_and_unique() {
    let phrase1 = generate_phrase().expect("Failed to generate phrase");
    let phrase2 = generate_phrase().expect("Failed to generate second phrase");

    // 12 words from 128 bits of entropy
    assert_eq!(phrase1.word_count(), 12);
    assert_eq!(phrase1.to_entropy().len(), 16);

    // Two calls never produce the same phrase in practice
    assert_ne!(phrase1.to_string(), phrase2.to_string());

    // Each phrase independently validates against its checksum
    let reparsed = Mnemonic::parse(&phrase1.to_string()).expect("phrase should be valid BIP39");
    assert_eq!(phrase1.to_string(), reparsed.to_string());
}

#[test]
fn derivation_is_deterministic_per_phrase_and_index() {
    let phrase = generate_phrase().expect("Failed to generate phrase");

    let kp_a = derive_keypair(&phrase, 0).expect("derivation should succeed");
    let kp_b = derive_keypair(&phrase, 0).expect("derivation should succeed");
    assert_eq!(kp_a.address(), kp_b.address());

    // Distinct indices are unlinkable
    let kp_other = derive_keypair(&phrase, 1).expect("derivation should succeed");
    assert_ne!(kp_a.address(), kp_other.address());

    // Distinct phrases are unlinkable
    let other = generate_phrase().expect("Failed to generate phrase");
    let kp_foreign = derive_keypair(&other, 0).expect("derivation should succeed");
    assert_ne!(kp_a.address(), kp_foreign.address());
}

#[test]
fn encrypt_decrypt_round_trip() {
    let password = "strong_password_123!@#";
    let secret = b"the quick brown fox";

    let vault = encrypt_vault(secret, password).expect("Failed to encrypt");
    let decrypted = decrypt_vault(&vault, password).expect("Failed to decrypt");
    assert_eq!(decrypted, secret);

    // Fresh salt and nonce per call: same data encrypts differently
    let vault2 = encrypt_vault(secret, password).expect("Failed to encrypt again");
    assert_ne!(vault.ciphertext, vault2.ciphertext);
    assert_ne!(vault.nonce, vault2.nonce);
    assert_ne!(vault.salt, vault2.salt);
    assert_eq!(decrypt_vault(&vault2, password).unwrap(), secret);
}

#[test]
fn phrase_round_trips_through_the_vault() {
    let phrase = generate_phrase().expect("Failed to generate phrase");
    let password = "pw1";

    let vault = encrypt_phrase(&phrase, password).expect("Failed to encrypt phrase");
    let restored = decrypt_phrase(&vault, password).expect("Failed to decrypt phrase");
    assert_eq!(phrase.to_string(), restored.to_string());
}

#[test]
fn wrong_password_fails_with_opaque_error() {
    let phrase = generate_phrase().expect("Failed to generate phrase");
    let vault = encrypt_phrase(&phrase, "correct_password").expect("Failed to encrypt");

    let result = decrypt_phrase(&vault, "wrong_password");
    match result {
        Err(VaultError::InvalidCredentials) => {}
        other => panic!("expected InvalidCredentials, got {:?}", other.map(|m| m.to_string())),
    }
}

#[test]
fn single_bit_flips_fail_closed_in_every_field() {
    let password = "pw1";
    let vault = encrypt_vault(b"secret payload", password).expect("Failed to encrypt");

    // Ciphertext tamper
    let tampered = EncryptedVault {
        ciphertext: flip_bit(&vault.ciphertext, 13),
        ..vault.clone()
    };
    assert!(matches!(
        decrypt_vault(&tampered, password),
        Err(VaultError::InvalidCredentials)
    ));

    // Nonce tamper
    let tampered = EncryptedVault {
        nonce: flip_bit(&vault.nonce, 5),
        ..vault.clone()
    };
    assert!(matches!(
        decrypt_vault(&tampered, password),
        Err(VaultError::InvalidCredentials)
    ));

    // Salt tamper
    let tampered = EncryptedVault {
        salt: flip_bit(&vault.salt, 77),
        ..vault.clone()
    };
    assert!(matches!(
        decrypt_vault(&tampered, password),
        Err(VaultError::InvalidCredentials)
    ));
}

#[test]
fn tamper_and_wrong_password_are_indistinguishable() {
    let vault = encrypt_vault(b"secret", "pw1").expect("Failed to encrypt");

    let wrong_password = decrypt_vault(&vault, "pw2").unwrap_err();
    let tampered_vault = EncryptedVault {
        ciphertext: flip_bit(&vault.ciphertext, 0),
        ..vault
    };
    let tampered = decrypt_vault(&tampered_vault, "pw1").unwrap_err();

    // Same message for both failure causes: no oracle for an attacker
    assert_eq!(wrong_password.to_string(), tampered.to_string());
    assert_eq!(wrong_password.to_string(), "invalid password or corrupted data");
}

#[test]
fn malformed_vault_fields_fail_with_the_same_error() {
    let vault = encrypt_vault(b"secret", "pw1").expect("Failed to encrypt");

    // Not hex at all
    let broken = EncryptedVault {
        salt: "zzzz".to_string(),
        ..vault.clone()
    };
    assert!(matches!(
        decrypt_vault(&broken, "pw1"),
        Err(VaultError::InvalidCredentials)
    ));

    // Truncated nonce
    let broken = EncryptedVault {
        nonce: vault.nonce[..8].to_string(),
        ..vault
    };
    assert!(matches!(
        decrypt_vault(&broken, "pw1"),
        Err(VaultError::InvalidCredentials)
    ));
}

#[test]
fn empty_password_is_accepted_by_the_codec() {
    let phrase = generate_phrase().expect("Failed to generate phrase");

    let vault = encrypt_phrase(&phrase, "").expect("empty password should encrypt");
    let restored = decrypt_phrase(&vault, "").expect("empty password should decrypt");
    assert_eq!(phrase.to_string(), restored.to_string());

    // But the password still has to match
    assert!(decrypt_phrase(&vault, "not_empty").is_err());
}
