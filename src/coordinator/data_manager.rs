//! Entry point for storing content in the DHT

use crate::common::{validate_key, Metrics, Result, WriteConfig};
use crate::coordinator::write::{PendingWrite, WriteCoordinator};
use crate::dht::{ReplicatedStore, WriteRequest};
use std::sync::Arc;

/// Puts and version removals against one replicated store
#[derive(Clone)]
pub struct DataManager {
    store: Arc<dyn ReplicatedStore>,
    max_put_retries: u32,
    metrics: Option<Arc<Metrics>>,
}

impl DataManager {
    pub fn new(store: Arc<dyn ReplicatedStore>, config: &WriteConfig) -> Self {
        Self {
            store,
            max_put_retries: config.max_put_retries,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Submit a put and return without waiting for its verdict
    pub fn put_unblocked(&self, request: WriteRequest) -> Result<PendingWrite> {
        validate_key(&request.location_key)?;
        validate_key(&request.content_key)?;

        let mut coordinator = WriteCoordinator::new(self.store.clone(), self.max_put_retries);
        if let Some(metrics) = &self.metrics {
            coordinator = coordinator.with_metrics(metrics.clone());
        }
        Ok(coordinator.submit(request))
    }

    /// Put and wait for the quorum verdict. `Ok(false)` means every retry
    /// was used up.
    pub async fn put(&self, request: WriteRequest) -> Result<bool> {
        let pending = self.put_unblocked(request)?;
        Ok(pending.wait().await)
    }

    /// Remove one version from the responsible peers. Best effort: a
    /// failure is logged and reported as `false`.
    pub async fn remove_version(&self, request: &WriteRequest) -> bool {
        let outcome = match self.store.remove_version(request) {
            Ok(future) => future.await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "Could not remove version");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::MemoryDht;
    use crate::Error;

    #[tokio::test]
    async fn test_put_and_remove() {
        let dht = MemoryDht::new(4, 3);
        let manager = DataManager::new(Arc::new(dht.clone()), &WriteConfig::default());
        let request = WriteRequest::new("loc", "content", &b"v"[..]);

        assert!(manager.put(request.clone()).await.unwrap());
        assert_eq!(dht.replica_count(&request.version_key()), 3);

        assert!(manager.remove_version(&request).await);
        assert_eq!(dht.replica_count(&request.version_key()), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected_before_submission() {
        let dht = MemoryDht::new(4, 3);
        let manager = DataManager::new(Arc::new(dht.clone()), &WriteConfig::default());

        let result = manager.put(WriteRequest::new("", "content", &b"v"[..])).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(dht.put_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_reports_failure() {
        let dht = MemoryDht::new(4, 3);
        dht.fail_removes(true);
        let manager = DataManager::new(Arc::new(dht), &WriteConfig::default());

        assert!(!manager.remove_version(&WriteRequest::new("loc", "c", &b"v"[..])).await);
    }
}
