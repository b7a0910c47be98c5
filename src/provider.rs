//! Page-side provider facade
//!
//! The object a dApp script talks to. Wraps the relay in a promise-style
//! request/response API keyed by correlation id, tracks the public
//! connection state, and re-broadcasts connection changes to registered
//! listeners. Key material never appears here, only the base58 public
//! key the background chooses to reveal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::messages::{Request, RequestEnvelope, Response, ResponseEnvelope, CONTENT_SENTINEL};

/// Provider errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The relay could not deliver the request or the response path died
    #[error("transport error: {0}")]
    Transport(String),

    /// The background answered with an `ERROR` response
    #[error("{0}")]
    Request(String),

    /// The background answered with a kind the caller cannot use
    #[error("unexpected response: expected {0}")]
    UnexpectedResponse(&'static str),
}

/// Connection notifications emitted to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A dApp connection was established
    Connect { public_key: String },

    /// The provider was disconnected
    Disconnect,
}

/// Handle returned by [`WalletProvider::subscribe`]
pub type ListenerId = u64;

type Listener = Box<dyn Fn(&ProviderEvent) + Send + Sync>;

#[derive(Default)]
struct ConnectionState {
    connected: bool,
    public_key: Option<String>,
}

/// State shared between the facade and its response pump
struct ProviderShared {
    pending: Mutex<HashMap<u64, oneshot::Sender<Response>>>,
    connection: Mutex<ConnectionState>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ProviderShared {
    /// Notify listeners in registration order
    fn emit(&self, event: &ProviderEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (_, listener) in listeners.iter() {
            listener(event);
        }
    }
}

/// The provider object exposed to page scripts
pub struct WalletProvider {
    origin: String,
    outbound: mpsc::Sender<Value>,
    next_id: AtomicU64,
    next_listener_id: AtomicU64,
    shared: Arc<ProviderShared>,
    pump: JoinHandle<()>,
}

impl WalletProvider {
    /// Attach a provider to the page side of the relay channels
    ///
    /// `origin` tags every connection request with the page's origin.
    /// Spawns the response pump that resolves pending requests as tagged
    /// responses arrive.
    pub fn new(
        origin: impl Into<String>,
        outbound: mpsc::Sender<Value>,
        inbound: mpsc::Receiver<Value>,
    ) -> Self {
        let shared = Arc::new(ProviderShared {
            pending: Mutex::new(HashMap::new()),
            connection: Mutex::new(ConnectionState::default()),
            listeners: Mutex::new(Vec::new()),
        });

        let pump = tokio::spawn(Self::pump(inbound, Arc::clone(&shared)));

        Self {
            origin: origin.into(),
            outbound,
            next_id: AtomicU64::new(1),
            next_listener_id: AtomicU64::new(1),
            shared,
            pump,
        }
    }

    /// Issue one request and await its correlated response
    ///
    /// Allocates a fresh correlation id, posts the tagged envelope, and
    /// resolves when a response carrying that id comes back. The facade
    /// imposes no deadline of its own: if the background never answers
    /// but the relay stays up, the future stays pending; callers that
    /// need a deadline impose their own.
    pub async fn request(&self, request: Request) -> Result<Response, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.insert(id, sender);
        }

        let envelope = RequestEnvelope::new(id, request);
        let message = match serde_json::to_value(&envelope) {
            Ok(message) => message,
            Err(e) => {
                self.forget(id);
                return Err(ProviderError::Transport(e.to_string()));
            }
        };

        if self.outbound.send(message).await.is_err() {
            self.forget(id);
            return Err(ProviderError::Transport(
                "background unreachable: relay channel closed".to_string(),
            ));
        }

        receiver
            .await
            .map_err(|_| ProviderError::Transport("provider shut down".to_string()))
    }

    /// Request a dApp connection; resolves to the wallet's public key
    ///
    /// May take as long as the background's unlock wait allows. On
    /// success the provider's connection state is already updated and
    /// the `Connect` event has been emitted.
    pub async fn connect(&self) -> Result<String, ProviderError> {
        let response = self
            .request(Request::ConnectDapp {
                origin: self.origin.clone(),
            })
            .await?;

        match response {
            Response::Connected { public_key_text } => Ok(public_key_text),
            Response::Error { message } => Err(ProviderError::Request(message)),
            _ => Err(ProviderError::UnexpectedResponse("CONNECTED")),
        }
    }

    /// Drop the connection state and notify listeners
    pub fn disconnect(&self) {
        {
            let mut connection = self
                .shared
                .connection
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            connection.connected = false;
            connection.public_key = None;
        }
        self.shared.emit(&ProviderEvent::Disconnect);
    }

    /// Ask the wallet to sign an arbitrary message
    pub async fn sign_message(&self, message: &[u8]) -> Result<String, ProviderError> {
        let response = self
            .request(Request::SignMessage {
                message_bytes: message.to_vec(),
            })
            .await?;

        match response {
            Response::Signed { signature } => Ok(signature),
            Response::Error { message } => Err(ProviderError::Request(message)),
            _ => Err(ProviderError::UnexpectedResponse("SIGNED")),
        }
    }

    /// Ask the wallet to sign a dApp transaction
    ///
    /// Documented limitation: the background currently answers this with
    /// a fixed "not implemented" error.
    pub async fn sign_transaction(&self, transaction: &str) -> Result<String, ProviderError> {
        let response = self
            .request(Request::SignTransactionDapp {
                transaction: transaction.to_string(),
                origin: self.origin.clone(),
            })
            .await?;

        match response {
            Response::Signed { signature } => Ok(signature),
            Response::Error { message } => Err(ProviderError::Request(message)),
            _ => Err(ProviderError::UnexpectedResponse("SIGNED")),
        }
    }

    /// Whether a dApp connection is currently established
    pub fn is_connected(&self) -> bool {
        self.shared
            .connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .connected
    }

    /// Public key of the connected wallet, if any
    pub fn public_key(&self) -> Option<String> {
        self.shared
            .connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .public_key
            .clone()
    }

    /// Register a connection-event listener
    ///
    /// Listeners are notified in registration order. The returned id
    /// unsubscribes.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ProviderEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Drop a pending entry after a send-side failure
    fn forget(&self, id: u64) {
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        pending.remove(&id);
    }

    /// Response pump: resolve pending requests as envelopes arrive
    ///
    /// Filters on the content sentinel; responses with no matching
    /// pending id are ignored. A `CONNECTED` response updates connection
    /// state and notifies listeners before the caller's future resolves.
    async fn pump(mut inbound: mpsc::Receiver<Value>, shared: Arc<ProviderShared>) {
        while let Some(message) = inbound.recv().await {
            match message.get("source").and_then(Value::as_str) {
                Some(CONTENT_SENTINEL) => {}
                _ => {
                    log::debug!("provider: dropping message without content sentinel");
                    continue;
                }
            }

            let envelope: ResponseEnvelope = match serde_json::from_value(message) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::debug!("provider: dropping malformed response: {}", e);
                    continue;
                }
            };

            let sender = {
                let mut pending = shared
                    .pending
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                pending.remove(&envelope.id)
            };

            let Some(sender) = sender else {
                log::debug!("provider: ignoring response with unknown id {}", envelope.id);
                continue;
            };

            if let Response::Connected { public_key_text } = &envelope.response {
                {
                    let mut connection = shared
                        .connection
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    connection.connected = true;
                    connection.public_key = Some(public_key_text.clone());
                }
                shared.emit(&ProviderEvent::Connect {
                    public_key: public_key_text.clone(),
                });
            }

            // A dropped receiver means the caller gave up on the round
            // trip; the response is discarded, not replayed.
            let _ = sender.send(envelope.response);
        }

        log::debug!("provider pump stopped: relay channel closed");
    }
}

impl Drop for WalletProvider {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
