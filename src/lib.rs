//! Vandal Wallet
//!
//! Non-custodial Solana devnet wallet core: encrypted recovery-phrase
//! vault, keyring lifecycle, background request router, and the
//! page-facing messaging stack (content relay + provider facade).

pub mod cli;
pub mod config;
pub mod keyring;
pub mod ledger;
pub mod messages;
pub mod provider;
pub mod relay;
pub mod router;
pub mod storage;
pub mod vault;
