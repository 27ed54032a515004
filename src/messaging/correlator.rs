//! Request/response correlation with a timeout
//!
//! [`MessageCorrelator::send`] submits a message and, when the message is a
//! request, waits for the matching response. The response callback is
//! registered before the message leaves, so even a response delivered on
//! the sending thread before the transport returns is not missed. The
//! registration is forgotten when the wait ends for any reason, including
//! the caller dropping the `send` future.

use crate::common::{gate, GateError, Metrics, MessagingConfig, Result, SendFailure};
use crate::messaging::message::{Message, MessageId, RecipientKey};
use crate::messaging::pending::{ResponseCallback, ResponseHandler};
use crate::messaging::MessageTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub struct MessageCorrelator {
    transport: Arc<dyn MessageTransport>,
    handler: Arc<dyn ResponseHandler>,
    response_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
    span: tracing::Span,
}

impl MessageCorrelator {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        handler: Arc<dyn ResponseHandler>,
        response_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            handler,
            response_timeout,
            metrics: None,
            span: tracing::info_span!("correlator"),
        }
    }

    pub fn from_config(
        transport: Arc<dyn MessageTransport>,
        handler: Arc<dyn ResponseHandler>,
        config: &MessagingConfig,
    ) -> Self {
        Self::new(transport, handler, config.response_timeout())
    }

    /// Name this correlator in its log lines
    pub fn named(mut self, name: &str) -> Self {
        self.span = tracing::info_span!("correlator", name = %name);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Send `message` to its recipient.
    ///
    /// Returns once the transport accepted the message, or, for requests,
    /// once the response arrived. Fails with [`SendFailure::Rejected`] when
    /// the transport refuses the message, [`SendFailure::Timeout`] when no
    /// response arrives in time and [`SendFailure::Interrupted`] when the
    /// transport drops the pending request.
    pub async fn send(&mut self, message: Message, recipient: &RecipientKey) -> Result<()> {
        let span = self.span.clone();
        self.send_inner(message, recipient).instrument(span).await
    }

    async fn send_inner(&mut self, message: Message, recipient: &RecipientKey) -> Result<()> {
        let id = message.id;
        let route = message.route.clone();

        // held across the wait; dropping it, also by cancelling `send`,
        // forgets the registration
        let response = if message.expects_response {
            let (signal, opened) = gate();
            self.transport
                .register_response(id, ResponseCallback::new(signal, self.handler.clone()));
            Some((opened, Registration::new(self.transport.clone(), id)))
        } else {
            None
        };

        let accepted = if message.is_direct() {
            self.transport.send_direct(message, recipient)
        } else {
            self.transport.send_routed(message, recipient)
        };

        if !accepted {
            drop(response);
            self.count(|m| m.messages_rejected.inc());
            tracing::warn!(message = %id, route = %route, "Transport refused the message");
            return Err(SendFailure::Rejected.into());
        }
        self.count(|m| m.messages_sent.inc());

        let Some((response, _registration)) = response else {
            tracing::debug!(message = %id, route = %route, "Message sent");
            return Ok(());
        };

        match response.wait_timeout(self.response_timeout).await {
            Ok(()) => {
                self.count(|m| m.responses_received.inc());
                tracing::debug!(message = %id, route = %route, "Response received");
                Ok(())
            }
            Err(GateError::TimedOut(waited)) => {
                self.count(|m| m.response_timeouts.inc());
                tracing::warn!(
                    message = %id,
                    route = %route,
                    recipient = %recipient.fingerprint(),
                    "Response did not arrive within {}ms",
                    waited.as_millis()
                );
                Err(SendFailure::Timeout(waited).into())
            }
            Err(GateError::Closed) => {
                tracing::warn!(message = %id, route = %route, "Pending response was dropped");
                Err(SendFailure::Interrupted.into())
            }
        }
    }

    fn count(&self, record: impl FnOnce(&Metrics)) {
        if let Some(metrics) = &self.metrics {
            record(metrics);
        }
    }
}

/// Registration of one pending response, forgotten on drop
struct Registration {
    transport: Arc<dyn MessageTransport>,
    id: MessageId,
}

impl Registration {
    fn new(transport: Arc<dyn MessageTransport>, id: MessageId) -> Self {
        Self { transport, id }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.transport.forget_response(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::PeerId;
    use crate::messaging::{IgnoreResponse, LoopbackTransport};
    use crate::Error;

    fn key() -> RecipientKey {
        RecipientKey::new(&b"recipient-public-key"[..])
    }

    fn correlator(transport: &LoopbackTransport, timeout: Duration) -> MessageCorrelator {
        MessageCorrelator::new(Arc::new(transport.clone()), Arc::new(IgnoreResponse), timeout)
    }

    #[tokio::test]
    async fn test_rejected_send_fails_without_waiting() {
        let transport = LoopbackTransport::new();
        transport.add_peer(PeerId::new("b"));
        transport.reject_sends(true);
        let mut correlator = correlator(&transport, Duration::from_secs(3600));

        let request =
            Message::direct(PeerId::new("a"), PeerId::new("b"), &b"ping"[..]).expecting_response();
        let result = correlator.send(request, &key()).await;

        assert!(matches!(result, Err(Error::SendFailed(SendFailure::Rejected))));
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_a_rejection() {
        let transport = LoopbackTransport::new();
        let mut correlator = correlator(&transport, Duration::from_secs(1));

        let message = Message::direct(PeerId::new("a"), PeerId::new("nobody"), &b"hi"[..]);
        let result = correlator.send(message, &key()).await;
        assert!(matches!(result, Err(Error::SendFailed(SendFailure::Rejected))));
    }

    #[tokio::test]
    async fn test_response_on_sending_thread_is_not_lost() {
        let transport = LoopbackTransport::new();
        transport.add_responder(PeerId::new("b"), Duration::ZERO, |_| {
            Some(bytes::Bytes::from_static(b"pong"))
        });
        let mut correlator = correlator(&transport, Duration::from_millis(50));

        let request =
            Message::direct(PeerId::new("a"), PeerId::new("b"), &b"ping"[..]).expecting_response();
        correlator.send(request, &key()).await.unwrap();
        assert_eq!(transport.pending_count(), 0);
    }
}
