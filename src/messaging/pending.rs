//! Registry of requests waiting for their response

use crate::common::GateSignal;
use crate::messaging::message::{MessageId, ResponseMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Caller-supplied handling of a matched response
pub trait ResponseHandler: Send + Sync {
    fn handle_response(&self, response: ResponseMessage);
}

impl<F> ResponseHandler for F
where
    F: Fn(ResponseMessage) + Send + Sync,
{
    fn handle_response(&self, response: ResponseMessage) {
        self(response)
    }
}

/// Handler that ignores the response; the sender only needs the wakeup
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreResponse;

impl ResponseHandler for IgnoreResponse {
    fn handle_response(&self, _response: ResponseMessage) {}
}

/// What runs when the response to one request arrives
pub struct ResponseCallback {
    signal: GateSignal<()>,
    handler: Arc<dyn ResponseHandler>,
}

impl ResponseCallback {
    pub fn new(signal: GateSignal<()>, handler: Arc<dyn ResponseHandler>) -> Self {
        Self { signal, handler }
    }

    /// Release the waiting sender, then run the handler. The sender may
    /// resume before, during or after the handler runs.
    pub fn deliver(self, response: ResponseMessage) {
        self.signal.signal(());
        self.handler.handle_response(response);
    }
}

/// Outstanding requests keyed by message id. Transports embed one and call
/// [`PendingResponses::dispatch`] for every response they receive.
#[derive(Clone, Default)]
pub struct PendingResponses {
    callbacks: Arc<Mutex<HashMap<MessageId, ResponseCallback>>>,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request: MessageId, callback: ResponseCallback) {
        self.lock().insert(request, callback);
    }

    /// Drop the registration of `request`. Returns false if none existed.
    pub fn forget(&self, request: MessageId) -> bool {
        self.lock().remove(&request).is_some()
    }

    /// Route a response to its request. A response nobody waits for any
    /// more is dropped.
    pub fn dispatch(&self, response: ResponseMessage) -> bool {
        let callback = self.lock().remove(&response.request_id);
        match callback {
            Some(callback) => {
                callback.deliver(response);
                true
            }
            None => {
                tracing::debug!(
                    request = %response.request_id,
                    from = %response.sender,
                    "Dropping response without pending request"
                );
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MessageId, ResponseCallback>> {
        // Callbacks run outside the lock, so poisoning leaves the map intact
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::gate;
    use crate::dht::PeerId;
    use crate::messaging::message::Message;

    #[tokio::test]
    async fn test_dispatch_opens_gate_and_runs_handler() {
        let pending = PendingResponses::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Arc<dyn ResponseHandler> = Arc::new(move |r: ResponseMessage| {
            sink.lock().unwrap().push(r.payload);
        });

        let request = Message::direct(PeerId::new("a"), PeerId::new("b"), &b"ping"[..]);
        let (signal, opened) = gate();
        pending.register(request.id, ResponseCallback::new(signal, handler));
        assert_eq!(pending.len(), 1);

        assert!(pending.dispatch(request.reply(PeerId::new("b"), &b"pong"[..])));
        assert_eq!(opened.wait().await, Ok(()));
        assert_eq!(seen.lock().unwrap().as_slice(), &[bytes::Bytes::from_static(b"pong")]);
        assert!(pending.is_empty());

        // a second response for the same request is ignored
        assert!(!pending.dispatch(request.reply(PeerId::new("b"), &b"again"[..])));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_forget_closes_gate() {
        let pending = PendingResponses::new();
        let (signal, opened) = gate();
        let id = MessageId::new();
        pending.register(id, ResponseCallback::new(signal, Arc::new(IgnoreResponse)));

        assert!(pending.forget(id));
        assert!(!pending.forget(id));
        assert_eq!(opened.wait().await, Err(crate::common::GateError::Closed));
    }
}
