//! Wallet lifecycle command implementations

use crate::config::{ConfigOverrides, WalletConfig};
use crate::messages::{Request, Response};
use crate::vault;

use super::{build_router, expect_ok, CommandError};

/// Create a new wallet with a generated recovery phrase
pub async fn create(password: String, overrides: ConfigOverrides) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;

    let mnemonic = vault::generate_phrase()?;
    let phrase = mnemonic.to_string();

    expect_ok(
        router
            .handle(Request::CreateWallet {
                phrase: phrase.clone(),
                password,
            })
            .await,
    )?;

    let keypair = vault::derive_keypair(&mnemonic, config.account_index)?;

    println!("✓ Wallet created successfully");
    println!();
    println!("  Cluster:  {}", config.ledger.cluster);
    println!("  Address:  {}", keypair.address());
    println!();
    println!("  IMPORTANT: Write down your recovery phrase:");
    println!("  {}", phrase);
    println!();
    println!("  Keep this phrase safe and secret!");

    Ok(())
}

/// Import a wallet from an existing recovery phrase
pub async fn import(
    phrase: String,
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;

    expect_ok(
        router
            .handle(Request::CreateWallet {
                phrase: phrase.clone(),
                password,
            })
            .await,
    )?;

    let mnemonic = bip39::Mnemonic::parse(&phrase)
        .map_err(|e| CommandError::Operation(format!("invalid recovery phrase: {}", e)))?;
    let keypair = vault::derive_keypair(&mnemonic, config.account_index)?;

    println!("✓ Wallet imported successfully");
    println!();
    println!("  Cluster:  {}", config.ledger.cluster);
    println!("  Address:  {}", keypair.address());

    Ok(())
}

/// Show wallet status
pub async fn status(overrides: ConfigOverrides) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;

    let response = expect_ok(router.handle(Request::GetStatus).await)?;
    if let Response::Status {
        has_wallet,
        is_locked,
    } = response
    {
        println!("Wallet:  {}", if has_wallet { "present" } else { "none" });
        println!("Locked:  {}", if is_locked { "yes" } else { "no" });
    }

    Ok(())
}

/// Delete the wallet and its vault
pub async fn reset(overrides: ConfigOverrides) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;

    expect_ok(router.handle(Request::ResetWallet).await)?;

    println!("✓ Wallet reset; the vault has been deleted");
    Ok(())
}
