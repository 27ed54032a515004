//! Step that sends one message and, for requests, waits for the response

use crate::common::Result;
use crate::messaging::{Message, MessageCorrelator, RecipientKey};
use crate::process::ProcessStep;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

pub struct MessageStep {
    correlator: MessageCorrelator,
    message: Message,
    recipient: RecipientKey,
}

impl MessageStep {
    pub fn new(correlator: MessageCorrelator, message: Message, recipient: RecipientKey) -> Self {
        Self {
            correlator,
            message,
            recipient,
        }
    }
}

impl ProcessStep for MessageStep {
    fn execute(&mut self) -> BoxFuture<'_, Result<()>> {
        let message = self.message.clone();
        async move { self.correlator.send(message, &self.recipient).await }.boxed()
    }

    /// A sent message cannot be taken back
    fn rollback(&mut self) -> BoxFuture<'_, Result<()>> {
        futures_util::future::ready(Ok(())).boxed()
    }
}
