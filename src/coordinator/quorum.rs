//! Quorum evaluation of a put's per-peer answers
//!
//! A put is accepted iff the peers that failed it are a strict minority of
//! the peers that answered: `failed < answered / 2`, so an exact 50% split
//! is a rejection.
//!
//! Only `FAILED` and `FAILED_SECURITY` count against a peer, as does a peer
//! that answered without any status map. Every other non-OK status is
//! logged as unexpected and otherwise ignored.

use crate::common::Result;
use crate::dht::{PeerId, PutStatus, StoreResponse};

/// Outcome of evaluating one put attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumDecision {
    /// Peers that denied the put or gave no status
    pub failed: Vec<PeerId>,
    /// Number of peers that answered
    pub answered: usize,
    pub accepted: bool,
}

impl QuorumDecision {
    fn rejected(failed: Vec<PeerId>, answered: usize) -> Self {
        Self {
            failed,
            answered,
            accepted: false,
        }
    }
}

/// The quorum rule on its own
pub fn is_quorum(failed: usize, answered: usize) -> bool {
    // failed < answered / 2 over the reals, kept in integers
    failed * 2 < answered
}

/// Evaluate the completion of one put attempt.
///
/// A failed future or an empty answer set rejects the attempt outright.
pub fn evaluate(completion: &Result<StoreResponse>) -> QuorumDecision {
    let response = match completion {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Put future was not successful");
            return QuorumDecision::rejected(Vec::new(), 0);
        }
    };
    if response.is_empty() {
        tracing::warn!("Returned raw results are empty");
        return QuorumDecision::rejected(Vec::new(), 0);
    }

    let mut failed = Vec::new();
    for ack in &response.acks {
        let Some(statuses) = &ack.statuses else {
            tracing::warn!(peer = %ack.peer, "A node gave no status back");
            failed.push(ack.peer.clone());
            continue;
        };
        for (key, status) in statuses {
            match status {
                PutStatus::Ok => {}
                PutStatus::Failed | PutStatus::FailedSecurity => {
                    tracing::warn!(
                        peer = %ack.peer,
                        version = %key,
                        reason = %status,
                        "A node denied putting data"
                    );
                    if !failed.contains(&ack.peer) {
                        failed.push(ack.peer.clone());
                    }
                }
                other => {
                    tracing::warn!(peer = %ack.peer, status = %other, "Got an unexpected status");
                }
            }
        }
    }

    let answered = response.len();
    let accepted = is_quorum(failed.len(), answered);
    if !accepted {
        tracing::warn!(
            "{} of {} contacted nodes failed",
            failed.len(),
            answered
        );
    }
    QuorumDecision {
        failed,
        answered,
        accepted,
    }
}
