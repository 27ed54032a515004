//! Quorum-verified replicated write
//!
//! A [`WriteCoordinator`] turns one put into a definite verdict. Attempts
//! run strictly one after another: each is evaluated against the quorum
//! rule and, when it falls short, its version is removed again before the
//! next attempt is issued. After `max_retries` retries the last attempt is
//! removed as well and the write is reported as failed.

use crate::common::{gate, CompletionGate, Metrics};
use crate::coordinator::quorum::{self, QuorumDecision};
use crate::dht::{ReplicatedStore, VersionKey, WriteRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Drives the retry chain of a single put
pub struct WriteCoordinator {
    store: Arc<dyn ReplicatedStore>,
    max_retries: u32,
    metrics: Option<Arc<Metrics>>,
}

impl WriteCoordinator {
    pub fn new(store: Arc<dyn ReplicatedStore>, max_retries: u32) -> Self {
        Self {
            store,
            max_retries,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the write in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(self, request: WriteRequest) -> PendingWrite {
        let (signal, verdict) = gate();
        let version_key = request.version_key();
        let span = tracing::info_span!("put", request = %request);

        tokio::spawn(
            async move {
                let started = Instant::now();
                let accepted = self.run(&request).await;
                if let Some(metrics) = &self.metrics {
                    metrics.record_verdict(accepted, started.elapsed());
                }
                signal.signal(accepted);
            }
            .instrument(span),
        );

        PendingWrite {
            verdict,
            version_key,
        }
    }

    async fn run(&self, request: &WriteRequest) -> bool {
        let mut retries: u32 = 0;
        loop {
            let decision = self.attempt(request).await;
            if decision.accepted {
                tracing::debug!(
                    failed = decision.failed.len(),
                    answered = decision.answered,
                    retries,
                    "Put reached quorum"
                );
                return true;
            }

            retries += 1;
            if retries > self.max_retries {
                tracing::error!("Could not put data after {} tries", retries);
                self.compensate(request).await;
                return false;
            }

            tracing::warn!("Put retry #{}", retries);
            self.compensate(request).await;
        }
    }

    async fn attempt(&self, request: &WriteRequest) -> QuorumDecision {
        if let Some(metrics) = &self.metrics {
            metrics.puts_attempted.inc();
        }
        let completion = match self.store.put(request) {
            Ok(future) => future.await,
            Err(e) => Err(e),
        };
        quorum::evaluate(&completion)
    }

    /// Best-effort removal of whatever the last attempt managed to store
    async fn compensate(&self, request: &WriteRequest) {
        if let Some(metrics) = &self.metrics {
            metrics.compensations.inc();
        }
        let outcome = match self.store.remove_version(request) {
            Ok(future) => future.await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Could not delete the newly put content");
            if let Some(metrics) = &self.metrics {
                metrics.compensations_failed.inc();
            }
        }
    }
}

/// Handle on a submitted write. Clones share the same verdict.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    verdict: CompletionGate<bool>,
    version_key: VersionKey,
}

impl PendingWrite {
    /// Wait until the write has a verdict. There is no timeout.
    ///
    /// If the write task goes away without publishing a verdict the wait
    /// is abandoned and the write counts as failed.
    pub async fn wait(&self) -> bool {
        match self.verdict.wait().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(
                    version = %self.version_key,
                    error = %e,
                    "Could not wait until put has finished"
                );
                false
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.verdict.is_open()
    }

    /// The verdict, if one has been published
    pub fn verdict(&self) -> Option<bool> {
        self.verdict.peek()
    }

    pub fn version_key(&self) -> &VersionKey {
        &self.version_key
    }
}
