//! Replicated storage boundary
//!
//! The DHT itself (routing, peer discovery, on-peer storage) lives outside
//! this crate. What the write path needs from it is captured by
//! [`ReplicatedStore`]: submit a put or a version removal and, later, learn
//! what every contacted peer answered.

pub mod memory;

use crate::common::{short_digest, Result};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use memory::{MemoryDht, PeerBehavior};

/// Identity of a peer taking part in the DHT
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified key of one stored version, as peers report it back
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionKey {
    pub location_key: String,
    pub content_key: String,
    pub version: u64,
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.location_key, self.content_key, self.version
        )
    }
}

/// Everything needed to (re-)issue a put or remove the version it wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub location_key: String,
    pub content_key: String,
    pub version: u64,
    /// Version this one was derived from, if any
    pub based_on: Option<u64>,
    pub content: Bytes,
}

impl WriteRequest {
    pub fn new(
        location_key: impl Into<String>,
        content_key: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            location_key: location_key.into(),
            content_key: content_key.into(),
            version: 0,
            based_on: None,
            content: content.into(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn based_on(mut self, version: u64) -> Self {
        self.based_on = Some(version);
        self
    }

    pub fn version_key(&self) -> VersionKey {
        VersionKey {
            location_key: self.location_key.clone(),
            content_key: self.content_key.clone(),
            version: self.version,
        }
    }
}

impl fmt::Display for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "location = '{}', content = '{}', version = {}, digest = {}",
            self.location_key,
            self.content_key,
            self.version,
            short_digest(&self.content)
        )?;
        if let Some(based_on) = self.based_on {
            write!(f, ", based_on = {}", based_on)?;
        }
        Ok(())
    }
}

/// Per-version status a peer reports for a put.
///
/// The numeric codes follow the storage layer's enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PutStatus {
    Ok,
    Failed,
    FailedSecurity,
    FailedNotAbsent,
    VersionFork,
    NotFound,
    Deleted,
    /// A code outside the known enumeration
    Unknown(u8),
}

impl PutStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => PutStatus::Ok,
            1 => PutStatus::Failed,
            2 => PutStatus::FailedSecurity,
            3 => PutStatus::FailedNotAbsent,
            4 => PutStatus::VersionFork,
            5 => PutStatus::NotFound,
            6 => PutStatus::Deleted,
            other => PutStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            PutStatus::Ok => 0,
            PutStatus::Failed => 1,
            PutStatus::FailedSecurity => 2,
            PutStatus::FailedNotAbsent => 3,
            PutStatus::VersionFork => 4,
            PutStatus::NotFound => 5,
            PutStatus::Deleted => 6,
            PutStatus::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for PutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutStatus::Ok => write!(f, "OK"),
            PutStatus::Failed => write!(f, "FAILED"),
            PutStatus::FailedSecurity => write!(f, "FAILED_SECURITY"),
            PutStatus::FailedNotAbsent => write!(f, "FAILED_NOT_ABSENT"),
            PutStatus::VersionFork => write!(f, "VERSION_FORK"),
            PutStatus::NotFound => write!(f, "NOT_FOUND"),
            PutStatus::Deleted => write!(f, "DELETED"),
            PutStatus::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// What one contacted peer answered. `statuses` is `None` when the peer
/// returned no status map at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaAck {
    pub peer: PeerId,
    pub statuses: Option<BTreeMap<VersionKey, PutStatus>>,
}

impl ReplicaAck {
    pub fn with_status(peer: PeerId, key: VersionKey, status: PutStatus) -> Self {
        let mut statuses = BTreeMap::new();
        statuses.insert(key, status);
        Self {
            peer,
            statuses: Some(statuses),
        }
    }

    pub fn silent(peer: PeerId) -> Self {
        Self {
            peer,
            statuses: None,
        }
    }
}

/// Completion payload of a put or remove: one entry per answering peer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreResponse {
    pub acks: Vec<ReplicaAck>,
}

impl StoreResponse {
    pub fn new(acks: Vec<ReplicaAck>) -> Self {
        Self { acks }
    }

    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.acks.len()
    }
}

/// Handle on an in-flight storage operation. Resolves to `Err` when the
/// operation failed outright.
pub type StoreFuture = BoxFuture<'static, Result<StoreResponse>>;

/// Asynchronous put/remove submission over the replicated store.
///
/// The outer `Result` reports whether the store accepted the operation at
/// all ([`crate::Error::SubmissionRejected`]); completion arrives through
/// the returned future.
pub trait ReplicatedStore: Send + Sync {
    fn put(&self, request: &WriteRequest) -> Result<StoreFuture>;

    fn remove_version(&self, request: &WriteRequest) -> Result<StoreFuture>;
}
