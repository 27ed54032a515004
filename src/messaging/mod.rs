//! Direct and routed peer messaging
//!
//! - Message envelopes and recipient credentials
//! - A registry matching responses to outstanding requests
//! - A correlator that turns a request into a single call with a timeout
//! - An in-process loopback transport

pub mod correlator;
pub mod loopback;
pub mod message;
pub mod pending;

pub use correlator::MessageCorrelator;
pub use loopback::LoopbackTransport;
pub use message::{Message, MessageId, RecipientKey, ResponseMessage, Route};
pub use pending::{IgnoreResponse, PendingResponses, ResponseCallback, ResponseHandler};

/// Outbound side of the network layer.
///
/// `send_*` report only whether the message was accepted for sending, not
/// whether it was delivered. Responses to requests are handed to the
/// callback registered for the request id, at most once, on whatever
/// thread the transport receives them.
pub trait MessageTransport: Send + Sync {
    /// Send to the peer named in [`Route::Direct`], without a routing lookup
    fn send_direct(&self, message: Message, recipient: &RecipientKey) -> bool;

    /// Send towards the key in [`Route::Routed`] through DHT routing
    fn send_routed(&self, message: Message, recipient: &RecipientKey) -> bool;

    fn register_response(&self, request: MessageId, callback: ResponseCallback);

    fn forget_response(&self, request: MessageId);
}
