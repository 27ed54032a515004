//! Step that persists one version in the DHT

use crate::common::{Error, Result};
use crate::coordinator::DataManager;
use crate::dht::WriteRequest;
use crate::process::ProcessStep;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

pub struct PutStep {
    data_manager: DataManager,
    request: WriteRequest,
    executed: bool,
}

impl PutStep {
    pub fn new(data_manager: DataManager, request: WriteRequest) -> Self {
        Self {
            data_manager,
            request,
            executed: false,
        }
    }

    async fn put(&mut self) -> Result<()> {
        // set before waiting so a rollback also cleans up a failed put
        self.executed = true;
        if self.data_manager.put(self.request.clone()).await? {
            Ok(())
        } else {
            Err(Error::PutFailed(self.request.to_string()))
        }
    }

    async fn remove(&mut self) -> Result<()> {
        if !std::mem::take(&mut self.executed) {
            return Ok(());
        }
        if !self.data_manager.remove_version(&self.request).await {
            tracing::warn!(request = %self.request, "Rollback could not remove the put version");
        }
        Ok(())
    }
}

impl ProcessStep for PutStep {
    fn execute(&mut self) -> BoxFuture<'_, Result<()>> {
        self.put().boxed()
    }

    fn rollback(&mut self) -> BoxFuture<'_, Result<()>> {
        self.remove().boxed()
    }
}
