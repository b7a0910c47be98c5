//! Message relay between the page context and the background authority
//!
//! The isolated forwarding layer. It holds no state across messages: it
//! filters inbound page messages on the inpage sentinel, hands valid
//! envelopes to the router, and posts each response back tagged with the
//! content sentinel and the original correlation id. Anything a page
//! script posts that is not a well-formed, sentinel-tagged envelope is
//! dropped here, before it can reach a privileged operation.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messages::{RequestEnvelope, ResponseEnvelope, INPAGE_SENTINEL};
use crate::router::Router;

/// The stateless forwarding task
pub struct ContentRelay;

impl ContentRelay {
    /// Spawn the relay between a page channel pair and the router
    ///
    /// `inbound` carries raw page messages (untrusted, arbitrary JSON);
    /// `outbound` carries tagged responses back to the page. Each valid
    /// envelope is dispatched on its own task so a slow request (the
    /// dApp-connect unlock wait in particular) never blocks the pipe
    /// for other messages. The relay exits when the page side closes.
    pub fn spawn(
        router: Arc<Router>,
        mut inbound: mpsc::Receiver<Value>,
        outbound: mpsc::Sender<Value>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let envelope = match parse_envelope(message) {
                    Some(envelope) => envelope,
                    None => continue,
                };

                let router = Arc::clone(&router);
                let outbound = outbound.clone();
                tokio::spawn(async move {
                    let id = envelope.id;
                    let response = router.handle(envelope.request).await;
                    let reply = ResponseEnvelope::new(id, response);

                    match serde_json::to_value(&reply) {
                        Ok(value) => {
                            if outbound.send(value).await.is_err() {
                                log::warn!("page channel closed before response {} was delivered", id);
                            }
                        }
                        Err(e) => log::error!("failed to encode response {}: {}", id, e),
                    }
                });
            }

            log::debug!("content relay stopped: page channel closed");
        })
    }
}

/// Validate one raw page message into a typed envelope
///
/// Returns `None` (message dropped) unless the payload is an object
/// carrying the inpage sentinel and parses into a known request.
fn parse_envelope(message: Value) -> Option<RequestEnvelope> {
    match message.get("source").and_then(Value::as_str) {
        Some(INPAGE_SENTINEL) => {}
        _ => {
            log::debug!("relay: dropping message without inpage sentinel");
            return None;
        }
    }

    match serde_json::from_value(message) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            log::debug!("relay: dropping malformed inpage message: {}", e);
            None
        }
    }
}
