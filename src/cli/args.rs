//! CLI argument definitions using clap

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "vandal-wallet",
    version,
    about = "Vandal Wallet - non-custodial Solana devnet wallet",
    long_about = None
)]
pub struct Cli {
    /// Cluster to use: devnet, testnet, mainnet-beta (overrides config)
    #[arg(short, long, global = true)]
    pub cluster: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Custom data directory for the vault
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wallet lifecycle commands
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Show the wallet balance
    Balance {
        /// Wallet password
        #[arg(short, long)]
        password: String,
    },

    /// Send SOL to an address
    Send {
        /// Recipient address (base58)
        to: String,

        /// Amount in SOL
        amount: f64,

        /// Wallet password
        #[arg(short, long)]
        password: String,
    },

    /// Show recent transaction history
    Transactions {
        /// Wallet password
        #[arg(short, long)]
        password: String,
    },

    /// Sign a UTF-8 message with the wallet key
    Sign {
        /// Message to sign
        message: String,

        /// Wallet password
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WalletAction {
    /// Create a new wallet with a generated recovery phrase
    Create {
        /// Password to encrypt the vault with
        #[arg(short, long)]
        password: String,
    },

    /// Import a wallet from an existing recovery phrase
    Import {
        /// 12-word recovery phrase (quoted)
        phrase: String,

        /// Password to encrypt the vault with
        #[arg(short, long)]
        password: String,
    },

    /// Show wallet status
    Status,

    /// Delete the wallet and its vault
    Reset,
}
