//! Vandal Wallet CLI
//!
//! Command-line harness around the wallet core: drives the background
//! router through the same request surface the extension relay uses.

use clap::Parser;
use std::process;
use vandal_wallet::cli::args::{Cli, Commands, WalletAction};
use vandal_wallet::cli::commands;
use vandal_wallet::config::{Cluster, ConfigOverrides};

fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    // Parse cluster string to Cluster
    let cluster = cli.cluster.as_ref().map(|c| match c.parse::<Cluster>() {
        Ok(cluster) => cluster,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    });

    // Build config overrides from global arguments
    let overrides = ConfigOverrides {
        cluster,
        rpc_url: cli.rpc_url.clone(),
        data_dir: cli.data_dir.clone(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create async runtime: {}", e);
            process::exit(1);
        }
    };

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Wallet { action } => match action {
            WalletAction::Create { password } => runtime
                .block_on(commands::wallet::create(password, overrides))
                .map_err(Into::into),

            WalletAction::Import { phrase, password } => runtime
                .block_on(commands::wallet::import(phrase, password, overrides))
                .map_err(Into::into),

            WalletAction::Status => runtime
                .block_on(commands::wallet::status(overrides))
                .map_err(Into::into),

            WalletAction::Reset => runtime
                .block_on(commands::wallet::reset(overrides))
                .map_err(Into::into),
        },

        Commands::Balance { password } => runtime
            .block_on(commands::ledger::balance(password, overrides))
            .map_err(Into::into),

        Commands::Send {
            to,
            amount,
            password,
        } => runtime
            .block_on(commands::ledger::send(to, amount, password, overrides))
            .map_err(Into::into),

        Commands::Transactions { password } => runtime
            .block_on(commands::ledger::transactions(password, overrides))
            .map_err(Into::into),

        Commands::Sign { message, password } => runtime
            .block_on(commands::ledger::sign(message, password, overrides))
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
