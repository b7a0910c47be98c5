//! Ledger RPC collaborator
//!
//! The background authority's view of the chain: balance lookup,
//! transfer submission, and signature history. The core treats this as
//! a black box behind the [`Ledger`] trait; retries and confirmation
//! tracking are the implementation's concern, never the router's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::vault::WalletKeypair;

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Lamports per SOL (the major unit)
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// System program id (all zeros)
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// System program instruction index for a lamport transfer
const TRANSFER_INSTRUCTION: u32 = 2;

/// How many history entries a transactions query returns
const SIGNATURE_HISTORY_LIMIT: u32 = 10;

/// Convert a major-unit amount to lamports
///
/// Rejects non-finite, non-positive, and overflowing amounts, plus
/// amounts that round below one lamport.
pub fn sol_to_lamports(amount: f64) -> Result<u64, LedgerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(
            "amount must be a positive number".to_string(),
        ));
    }

    let lamports = (amount * LAMPORTS_PER_SOL as f64).round();
    if lamports < 1.0 {
        return Err(LedgerError::InvalidAmount(
            "amount is below one lamport".to_string(),
        ));
    }
    if lamports > u64::MAX as f64 {
        return Err(LedgerError::InvalidAmount(
            "amount exceeds the representable lamport range".to_string(),
        ));
    }

    Ok(lamports as u64)
}

/// Convert lamports to a major-unit amount for display
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Decode and validate a base58 account address
pub fn decode_address(address: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", address, e)))?;

    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidAddress(format!("{}: not 32 bytes", address)))
}

/// One entry of an account's signature history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction signature (base58)
    pub signature: String,

    /// Slot the transaction landed in
    pub slot: u64,

    /// Failure detail if the transaction errored on chain
    #[serde(default)]
    pub err: Option<String>,

    /// Cluster confirmation status ("processed" / "confirmed" / "finalized")
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

/// Chain operations the router depends on
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Balance of an account in lamports
    async fn balance(&self, address: &str) -> Result<u64, LedgerError>;

    /// Build, sign, and submit a transfer; returns the transaction signature
    async fn submit_transfer(
        &self,
        from: &WalletKeypair,
        to: &str,
        lamports: u64,
    ) -> Result<String, LedgerError>;

    /// Recent signature history for an account, newest first
    async fn recent_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// JSON-RPC ledger client
///
/// Speaks the Solana JSON-RPC 2.0 surface against a configurable
/// endpoint: `getBalance`, `getLatestBlockhash`, `sendTransaction`,
/// `getSignaturesForAddress`.
pub struct HttpLedger {
    client: reqwest::Client,
    url: String,
}

impl HttpLedger {
    /// Client against a specific RPC endpoint
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ledger = HttpLedger::new("https://api.devnet.solana.com");
    /// ```
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Issue one JSON-RPC call and unwrap the `result` field
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        log::debug!("rpc {} -> {}", method, self.url);
        let response: Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(LedgerError::Rpc(message));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Rpc(format!("{}: response carried no result", method)))
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn balance(&self, address: &str) -> Result<u64, LedgerError> {
        decode_address(address)?;

        let result = self.rpc_call("getBalance", json!([address])).await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| LedgerError::Rpc("getBalance: malformed result".to_string()))
    }

    async fn submit_transfer(
        &self,
        from: &WalletKeypair,
        to: &str,
        lamports: u64,
    ) -> Result<String, LedgerError> {
        let to_bytes = decode_address(to)?;

        let result = self
            .rpc_call("getLatestBlockhash", json!([{"commitment": "finalized"}]))
            .await?;
        let blockhash_text = result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Rpc("getLatestBlockhash: malformed result".to_string()))?;
        let blockhash = decode_address(blockhash_text)
            .map_err(|_| LedgerError::Rpc(format!("unusable blockhash: {}", blockhash_text)))?;

        let transaction = build_transfer_transaction(from, &to_bytes, lamports, &blockhash);
        let encoded = bs58::encode(&transaction).into_string();

        let result = self
            .rpc_call("sendTransaction", json!([encoded, {"encoding": "base58"}]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LedgerError::Rpc("sendTransaction: malformed result".to_string()))
    }

    async fn recent_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        decode_address(address)?;

        let result = self
            .rpc_call(
                "getSignaturesForAddress",
                json!([address, {"limit": SIGNATURE_HISTORY_LIMIT}]),
            )
            .await?;
        let entries = result
            .as_array()
            .ok_or_else(|| LedgerError::Rpc("getSignaturesForAddress: malformed result".to_string()))?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let signature = entry
                .get("signature")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    LedgerError::Rpc("getSignaturesForAddress: entry without signature".to_string())
                })?;

            // `err` is null for successes and a structured object otherwise;
            // callers only need it as display text.
            let err = entry
                .get("err")
                .filter(|v| !v.is_null())
                .map(Value::to_string);

            records.push(TransactionRecord {
                signature: signature.to_string(),
                slot: entry.get("slot").and_then(Value::as_u64).unwrap_or(0),
                err,
                confirmation_status: entry
                    .get("confirmationStatus")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        Ok(records)
    }
}

/// Assemble and sign a minimal legacy transfer transaction
///
/// Wire layout: compact array of signatures, then the message
/// (header, compact account list `[from, to, system program]`, recent
/// blockhash, compact instruction list with the system-program transfer
/// instruction `u32 LE 2 || u64 LE lamports`).
fn build_transfer_transaction(
    from: &WalletKeypair,
    to: &[u8; 32],
    lamports: u64,
    blockhash: &[u8; 32],
) -> Vec<u8> {
    let from_pub = from.public_key().to_bytes();

    let mut message = Vec::with_capacity(3 + 1 + 96 + 32 + 16);
    // header: 1 required signature, 0 readonly signed, 1 readonly unsigned
    message.push(1);
    message.push(0);
    message.push(1);

    push_compact_len(&mut message, 3);
    message.extend_from_slice(&from_pub);
    message.extend_from_slice(to);
    message.extend_from_slice(&SYSTEM_PROGRAM_ID);

    message.extend_from_slice(blockhash);

    push_compact_len(&mut message, 1);
    message.push(2); // program id index (system program)
    push_compact_len(&mut message, 2);
    message.push(0); // from
    message.push(1); // to

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_INSTRUCTION.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    push_compact_len(&mut message, data.len() as u16);
    message.extend_from_slice(&data);

    let signature = from.sign(&message);

    let mut transaction = Vec::with_capacity(1 + 64 + message.len());
    push_compact_len(&mut transaction, 1);
    transaction.extend_from_slice(&signature.to_bytes());
    transaction.extend_from_slice(&message);
    transaction
}

/// Append a shortvec (compact-u16) length prefix
fn push_compact_len(buf: &mut Vec<u8>, mut value: u16) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault;

    #[test]
    fn sol_to_lamports_converts_and_validates() {
        assert_eq!(sol_to_lamports(1.0).unwrap(), LAMPORTS_PER_SOL);
        assert_eq!(sol_to_lamports(0.5).unwrap(), 500_000_000);

        assert!(matches!(
            sol_to_lamports(0.0),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            sol_to_lamports(-1.0),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            sol_to_lamports(f64::NAN),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            sol_to_lamports(1e-12),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn address_decoding_requires_32_bytes() {
        let mnemonic = vault::generate_phrase().unwrap();
        let keypair = vault::derive_keypair(&mnemonic, 0).unwrap();
        assert!(decode_address(&keypair.address()).is_ok());

        assert!(decode_address("not-an-address!").is_err());
        assert!(decode_address("abc").is_err());
    }

    #[test]
    fn shortvec_encoding_matches_known_values() {
        let mut buf = Vec::new();
        push_compact_len(&mut buf, 0);
        assert_eq!(buf, [0x00]);

        buf.clear();
        push_compact_len(&mut buf, 3);
        assert_eq!(buf, [0x03]);

        buf.clear();
        push_compact_len(&mut buf, 0x7f);
        assert_eq!(buf, [0x7f]);

        buf.clear();
        push_compact_len(&mut buf, 0x80);
        assert_eq!(buf, [0x80, 0x01]);

        buf.clear();
        push_compact_len(&mut buf, 0x3fff);
        assert_eq!(buf, [0xff, 0x7f]);
    }

    #[test]
    fn transfer_transaction_signature_covers_the_message() {
        use ed25519_dalek::{Signature, Verifier};

        let mnemonic = vault::generate_phrase().unwrap();
        let from = vault::derive_keypair(&mnemonic, 0).unwrap();
        let to = vault::derive_keypair(&mnemonic, 1).unwrap();
        let to_bytes = to.public_key().to_bytes();
        let blockhash = [7u8; 32];

        let transaction = build_transfer_transaction(&from, &to_bytes, 42, &blockhash);

        // 1-byte signature count, 64-byte signature, message after
        assert_eq!(transaction[0], 1);
        let signature = Signature::from_bytes(transaction[1..65].try_into().unwrap());
        let message = &transaction[65..];
        assert!(from.public_key().verify(message, &signature).is_ok());

        // fee payer is the first account in the message
        assert_eq!(&message[4..36], from.public_key().to_bytes().as_slice());
    }
}
