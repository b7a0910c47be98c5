//! Request/response envelope shared across the relay
//!
//! Closed tagged types for everything that crosses the page/background
//! boundary. Wire form is `{ "type": ..., "payload": ... }`, matching
//! what the provider posts and the background answers; anything that
//! does not parse into these types is rejected at the relay boundary
//! before dispatch.

use serde::{Deserialize, Serialize};

use crate::ledger::TransactionRecord;

/// Sentinel tag on messages travelling page -> relay
pub const INPAGE_SENTINEL: &str = "vandal-inpage";

/// Sentinel tag on messages travelling relay -> page
pub const CONTENT_SENTINEL: &str = "vandal-content";

/// Requests accepted by the background authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    /// Create a wallet from a recovery phrase and password
    CreateWallet { phrase: String, password: String },

    /// Unlock the existing wallet
    UnlockWallet { password: String },

    /// Lock the wallet, dropping key material from memory
    LockWallet,

    /// Destroy the wallet entirely
    ResetWallet,

    /// Query lifecycle status
    GetStatus,

    /// Query the balance of the primary account
    GetBalance,

    /// Build, sign, and submit a transfer
    SendTransaction { to: String, amount_major_units: f64 },

    /// Query recent transaction history
    GetTransactions,

    /// Sign an arbitrary message with the primary account key
    SignMessage { message_bytes: Vec<u8> },

    /// dApp connection handshake
    ConnectDapp { origin: String },

    /// dApp-initiated transaction signing (documented limitation: always
    /// answered with a fixed "not implemented" error)
    SignTransactionDapp { transaction: String, origin: String },
}

/// Responses produced by the background authority
///
/// Every request receives exactly one of these; internal failures are
/// flattened into `Error` before they reach the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Response {
    /// Operation completed with nothing to report
    Success,

    /// Operation failed; `message` is the only detail callers get
    Error { message: String },

    /// Lifecycle status snapshot
    Status { has_wallet: bool, is_locked: bool },

    /// Balance in major units plus the queried account's address
    Balance { amount: f64, public_key_text: String },

    /// Successful dApp connection
    Connected { public_key_text: String },

    /// Signature produced by a sign or send operation (base58)
    Signed { signature: String },

    /// Recent transaction history
    Transactions { list: Vec<TransactionRecord> },
}

impl Response {
    /// Shorthand for an error response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

/// Envelope carried on the page -> background hop
///
/// `source` must equal [`INPAGE_SENTINEL`] or the relay drops the
/// message; `id` correlates the eventual response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub source: String,
    pub id: u64,
    #[serde(flatten)]
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(id: u64, request: Request) -> Self {
        Self {
            source: INPAGE_SENTINEL.to_string(),
            id,
            request,
        }
    }
}

/// Envelope carried on the background -> page hop
///
/// Tagged with [`CONTENT_SENTINEL`] and the originating request's `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub source: String,
    pub id: u64,
    #[serde(flatten)]
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(id: u64, response: Response) -> Self {
        Self {
            source: CONTENT_SENTINEL.to_string(),
            id,
            response,
        }
    }
}
