//! Message envelopes exchanged between peers

use crate::common::short_digest;
use crate::dht::PeerId;
use bytes::Bytes;
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a message; responses refer back to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a message finds its recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Straight to a known peer, no routing lookup
    Direct(PeerId),
    /// To whichever peer the DHT routes this key to
    Routed(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct(peer) => write!(f, "direct:{}", peer),
            Route::Routed(key) => write!(f, "routed:{}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: PeerId,
    pub route: Route,
    /// Requests are answered by exactly one [`ResponseMessage`]
    pub expects_response: bool,
    pub payload: Bytes,
}

impl Message {
    pub fn direct(sender: PeerId, target: PeerId, payload: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            route: Route::Direct(target),
            expects_response: false,
            payload: payload.into(),
        }
    }

    pub fn routed(sender: PeerId, key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            route: Route::Routed(key.into()),
            expects_response: false,
            payload: payload.into(),
        }
    }

    /// Turn this message into a request that waits for a response
    pub fn expecting_response(mut self) -> Self {
        self.expects_response = true;
        self
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.route, Route::Direct(_))
    }

    /// Build the response to this message
    pub fn reply(&self, sender: PeerId, payload: impl Into<Bytes>) -> ResponseMessage {
        ResponseMessage {
            request_id: self.id,
            sender,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub request_id: MessageId,
    pub sender: PeerId,
    pub payload: Bytes,
}

/// Credential of the recipient (its public key). Passed through to the
/// transport untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientKey(Bytes);

impl RecipientKey {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short fingerprint for log lines
    pub fn fingerprint(&self) -> String {
        short_digest(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_refers_to_request() {
        let request = Message::routed(PeerId::new("a"), "user-b", &b"ping"[..]).expecting_response();
        assert!(request.expects_response);
        assert!(!request.is_direct());

        let response = request.reply(PeerId::new("b"), &b"pong"[..]);
        assert_eq!(response.request_id, request.id);
        assert_ne!(MessageId::new(), request.id);
    }
}
