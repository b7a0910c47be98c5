//! Ledger command implementations

use crate::config::{ConfigOverrides, WalletConfig};
use crate::messages::{Request, Response};
use crate::router::Router;

use super::{build_router, expect_ok, CommandError};

/// Unlock the keyring for this invocation
async fn unlock(router: &Router, password: String) -> Result<(), CommandError> {
    expect_ok(router.handle(Request::UnlockWallet { password }).await)?;
    Ok(())
}

/// Show the wallet balance
pub async fn balance(password: String, overrides: ConfigOverrides) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;
    unlock(&router, password).await?;

    let response = expect_ok(router.handle(Request::GetBalance).await)?;
    if let Response::Balance {
        amount,
        public_key_text,
    } = response
    {
        println!("Address:  {}", public_key_text);
        println!("Balance:  {} SOL ({})", amount, config.ledger.cluster);
    }

    Ok(())
}

/// Send SOL to an address
pub async fn send(
    to: String,
    amount: f64,
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;
    unlock(&router, password).await?;

    let response = expect_ok(
        router
            .handle(Request::SendTransaction {
                to,
                amount_major_units: amount,
            })
            .await,
    )?;
    if let Response::Signed { signature } = response {
        println!("✓ Transfer submitted");
        println!("  Signature: {}", signature);
    }

    Ok(())
}

/// Show recent transaction history
pub async fn transactions(
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;
    unlock(&router, password).await?;

    let response = expect_ok(router.handle(Request::GetTransactions).await)?;
    if let Response::Transactions { list } = response {
        if list.is_empty() {
            println!("No transactions yet");
            return Ok(());
        }

        for record in list {
            let status = match &record.err {
                Some(err) => format!("failed: {}", err),
                None => record
                    .confirmation_status
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            };
            println!("{}  slot {}  {}", record.signature, record.slot, status);
        }
    }

    Ok(())
}

/// Sign a UTF-8 message with the wallet key
pub async fn sign(
    message: String,
    password: String,
    overrides: ConfigOverrides,
) -> Result<(), CommandError> {
    let config = WalletConfig::default_devnet().apply_overrides(&overrides)?;
    let router = build_router(&config)?;
    unlock(&router, password).await?;

    let response = expect_ok(
        router
            .handle(Request::SignMessage {
                message_bytes: message.into_bytes(),
            })
            .await,
    )?;
    if let Response::Signed { signature } = response {
        println!("Signature: {}", signature);
    }

    Ok(())
}
