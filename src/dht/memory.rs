//! In-process simulated DHT
//!
//! Every peer keeps its own version map. A put reaches the peers
//! responsible for the request's location key (HRW placement with the
//! configured replication factor) and each of them answers according to its
//! [`PeerBehavior`]. Used by the simulator binary and by tests to drive the
//! write path through faulty replicas.

use super::{
    PeerId, PutStatus, ReplicaAck, ReplicatedStore, StoreFuture, StoreResponse, VersionKey,
    WriteRequest,
};
use crate::common::{select_replicas, DhtConfig, Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a simulated peer answers puts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerBehavior {
    /// Store the value and answer OK
    Accept,
    /// Answer FAILED
    Deny,
    /// Answer FAILED_SECURITY
    DenySecurity,
    /// Answer FAILED for the next `n` puts, then accept
    DenyTimes(u32),
    /// Answer without a status map
    Silent,
    /// Answer with an arbitrary raw status code
    Status(u8),
    /// Do not answer at all
    Offline,
}

#[derive(Debug)]
struct PeerNode {
    id: PeerId,
    behavior: PeerBehavior,
    versions: HashMap<VersionKey, Bytes>,
}

impl PeerNode {
    fn new(id: PeerId) -> Self {
        Self {
            id,
            behavior: PeerBehavior::Accept,
            versions: HashMap::new(),
        }
    }

    /// Apply a put and return what this peer answers
    fn apply_put(&mut self, request: &WriteRequest) -> Option<ReplicaAck> {
        let key = request.version_key();
        let status = match self.behavior {
            PeerBehavior::Offline => return None,
            PeerBehavior::Silent => return Some(ReplicaAck::silent(self.id.clone())),
            PeerBehavior::Accept => PutStatus::Ok,
            PeerBehavior::Deny => PutStatus::Failed,
            PeerBehavior::DenySecurity => PutStatus::FailedSecurity,
            PeerBehavior::DenyTimes(0) => {
                self.behavior = PeerBehavior::Accept;
                PutStatus::Ok
            }
            PeerBehavior::DenyTimes(n) => {
                self.behavior = PeerBehavior::DenyTimes(n - 1);
                PutStatus::Failed
            }
            PeerBehavior::Status(code) => PutStatus::from_code(code),
        };
        if status == PutStatus::Ok {
            self.versions.insert(key.clone(), request.content.clone());
        }
        Some(ReplicaAck::with_status(self.id.clone(), key, status))
    }

    fn apply_remove(&mut self, key: &VersionKey) -> Option<ReplicaAck> {
        if self.behavior == PeerBehavior::Offline {
            return None;
        }
        let status = match self.versions.remove(key) {
            Some(_) => PutStatus::Ok,
            None => PutStatus::NotFound,
        };
        Some(ReplicaAck::with_status(self.id.clone(), key.clone(), status))
    }
}

#[derive(Debug, Default)]
struct DhtState {
    peers: Vec<PeerNode>,
    reject_submissions: bool,
    failing_puts: u32,
    fail_removes: bool,
}

impl DhtState {
    fn responsible(&mut self, location_key: &str, replicas: usize) -> Vec<&mut PeerNode> {
        let ids: Vec<PeerId> = self.peers.iter().map(|p| p.id.clone()).collect();
        let chosen = select_replicas(location_key, &ids, replicas);
        self.peers
            .iter_mut()
            .filter(|p| chosen.contains(&p.id))
            .collect()
    }
}

/// Simulated replicated store
#[derive(Debug, Clone)]
pub struct MemoryDht {
    state: Arc<Mutex<DhtState>>,
    replication_factor: usize,
    latency: Duration,
    puts: Arc<AtomicU32>,
    removes: Arc<AtomicU32>,
}

impl MemoryDht {
    /// Create a DHT of `peers` accepting peers named `peer-1..=peer-N`
    pub fn new(peers: usize, replication_factor: usize) -> Self {
        let nodes = (1..=peers)
            .map(|i| PeerNode::new(PeerId::new(format!("peer-{}", i))))
            .collect();
        Self {
            state: Arc::new(Mutex::new(DhtState {
                peers: nodes,
                ..Default::default()
            })),
            replication_factor,
            latency: Duration::ZERO,
            puts: Arc::new(AtomicU32::new(0)),
            removes: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn from_config(config: &DhtConfig) -> Self {
        Self::new(config.peers, config.replication_factor)
            .with_latency(Duration::from_millis(config.latency_ms))
    }

    /// Delay every completion by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.lock().peers.iter().map(|p| p.id.clone()).collect()
    }

    /// Peers that receive puts for `location_key`
    pub fn responsible_peers(&self, location_key: &str) -> Vec<PeerId> {
        select_replicas(location_key, &self.peers(), self.replication_factor)
    }

    pub fn set_behavior(&self, peer: &PeerId, behavior: PeerBehavior) {
        let mut state = self.lock();
        if let Some(node) = state.peers.iter_mut().find(|p| &p.id == peer) {
            node.behavior = behavior;
        }
    }

    /// Refuse every submission synchronously while `reject` is set
    pub fn reject_submissions(&self, reject: bool) {
        self.lock().reject_submissions = reject;
    }

    /// Fail the completion of the next `n` puts outright
    pub fn fail_next_puts(&self, n: u32) {
        self.lock().failing_puts = n;
    }

    /// Fail the completion of every removal while `fail` is set
    pub fn fail_removes(&self, fail: bool) {
        self.lock().fail_removes = fail;
    }

    /// Number of puts accepted for submission so far
    pub fn put_count(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of removals accepted for submission so far
    pub fn remove_count(&self) -> u32 {
        self.removes.load(Ordering::SeqCst)
    }

    /// Number of peers currently holding `key`
    pub fn replica_count(&self, key: &VersionKey) -> usize {
        self.lock()
            .peers
            .iter()
            .filter(|p| p.versions.contains_key(key))
            .count()
    }

    /// Content stored under `key` on any peer
    pub fn get(&self, key: &VersionKey) -> Option<Bytes> {
        self.lock()
            .peers
            .iter()
            .find_map(|p| p.versions.get(key).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DhtState> {
        // A poisoned simulator state is still consistent enough to inspect
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_submission(&self) -> Result<()> {
        if self.lock().reject_submissions {
            return Err(Error::SubmissionRejected(
                "simulated DHT refuses submissions".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReplicatedStore for MemoryDht {
    fn put(&self, request: &WriteRequest) -> Result<StoreFuture> {
        self.check_submission()?;
        self.puts.fetch_add(1, Ordering::SeqCst);

        let dht = self.clone();
        let request = request.clone();
        Ok(Box::pin(async move {
            if !dht.latency.is_zero() {
                tokio::time::sleep(dht.latency).await;
            } else {
                tokio::task::yield_now().await;
            }

            let mut state = dht.lock();
            if state.failing_puts > 0 {
                state.failing_puts -= 1;
                return Err(Error::FutureFailed(format!(
                    "simulated put failure for {}",
                    request.version_key()
                )));
            }
            let acks = state
                .responsible(&request.location_key, dht.replication_factor)
                .into_iter()
                .filter_map(|peer| peer.apply_put(&request))
                .collect();
            Ok(StoreResponse::new(acks))
        }))
    }

    fn remove_version(&self, request: &WriteRequest) -> Result<StoreFuture> {
        self.check_submission()?;
        self.removes.fetch_add(1, Ordering::SeqCst);

        let dht = self.clone();
        let key = request.version_key();
        let location_key = request.location_key.clone();
        Ok(Box::pin(async move {
            if !dht.latency.is_zero() {
                tokio::time::sleep(dht.latency).await;
            } else {
                tokio::task::yield_now().await;
            }

            let mut state = dht.lock();
            if state.fail_removes {
                return Err(Error::FutureFailed(format!(
                    "simulated remove failure for {}",
                    key
                )));
            }
            let acks = state
                .responsible(&location_key, dht.replication_factor)
                .into_iter()
                .filter_map(|peer| peer.apply_remove(&key))
                .collect();
            Ok(StoreResponse::new(acks))
        }))
    }
}
