//! In-process message transport
//!
//! Peers are registered with an optional responder. A request sent to a
//! peer with a responder is answered after the peer's delay; with a zero
//! delay the response is delivered before `send_*` returns. Routed
//! messages go to the registered peer closest to the key by HRW weight.

use crate::common::hrw_hash;
use crate::dht::PeerId;
use crate::messaging::message::{Message, MessageId, RecipientKey, Route};
use crate::messaging::pending::{PendingResponses, ResponseCallback};
use crate::messaging::MessageTransport;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Computes a peer's answer to a request; `None` leaves it unanswered
pub type Responder = Arc<dyn Fn(&Message) -> Option<Bytes> + Send + Sync>;

#[derive(Clone)]
struct Endpoint {
    responder: Option<Responder>,
    delay: Duration,
}

#[derive(Clone, Default)]
pub struct LoopbackTransport {
    endpoints: Arc<Mutex<HashMap<PeerId, Endpoint>>>,
    pending: PendingResponses,
    rejecting: Arc<AtomicBool>,
    delivered: Arc<Mutex<Vec<MessageId>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer that receives messages but never answers
    pub fn add_peer(&self, peer: PeerId) {
        self.endpoints().insert(
            peer,
            Endpoint {
                responder: None,
                delay: Duration::ZERO,
            },
        );
    }

    /// Register a peer answering requests through `responder` after `delay`
    pub fn add_responder<F>(&self, peer: PeerId, delay: Duration, responder: F)
    where
        F: Fn(&Message) -> Option<Bytes> + Send + Sync + 'static,
    {
        self.endpoints().insert(
            peer,
            Endpoint {
                responder: Some(Arc::new(responder)),
                delay,
            },
        );
    }

    /// Refuse every message while `reject` is set
    pub fn reject_sends(&self, reject: bool) {
        self.rejecting.store(reject, Ordering::SeqCst);
    }

    /// Ids of all messages accepted so far, in order
    pub fn delivered(&self) -> Vec<MessageId> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Peer a routed key resolves to
    pub fn route(&self, key: &str) -> Option<PeerId> {
        let peers: Vec<PeerId> = self.endpoints().keys().cloned().collect();
        hrw_hash(key, &peers).into_iter().next()
    }

    fn endpoints(&self) -> std::sync::MutexGuard<'_, HashMap<PeerId, Endpoint>> {
        self.endpoints.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliver(&self, target: PeerId, message: Message) -> bool {
        if self.rejecting.load(Ordering::SeqCst) {
            return false;
        }
        let Some(endpoint) = self.endpoints().get(&target).cloned() else {
            tracing::debug!(peer = %target, "No such peer");
            return false;
        };
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.id);

        if !message.expects_response {
            return true;
        }
        let Some(responder) = endpoint.responder else {
            return true;
        };

        let pending = self.pending.clone();
        let answer = move || {
            if let Some(payload) = responder(&message) {
                pending.dispatch(message.reply(target, payload));
            }
        };
        if endpoint.delay.is_zero() {
            answer();
        } else {
            let delay = endpoint.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                answer();
            });
        }
        true
    }
}

impl MessageTransport for LoopbackTransport {
    fn send_direct(&self, message: Message, _recipient: &RecipientKey) -> bool {
        let Route::Direct(target) = message.route.clone() else {
            return false;
        };
        self.deliver(target, message)
    }

    fn send_routed(&self, message: Message, _recipient: &RecipientKey) -> bool {
        let Route::Routed(key) = &message.route else {
            return false;
        };
        match self.route(key) {
            Some(target) => self.deliver(target, message),
            None => false,
        }
    }

    fn register_response(&self, request: MessageId, callback: ResponseCallback) {
        self.pending.register(request, callback);
    }

    fn forget_response(&self, request: MessageId) {
        self.pending.forget(request);
    }
}
