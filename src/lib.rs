//! # hivesync
//!
//! Coordination layer of a peer-to-peer file synchronization engine that
//! keeps file metadata and content in a DHT spread across untrusted peers:
//! - Quorum-verified replicated writes with bounded retries
//! - Compensating removals of partially replicated versions
//! - Request/response correlation with a timeout for direct and routed messages
//! - One-shot completion gates bridging asynchronous completions to waiting callers
//!
//! ## Architecture
//!
//! ```text
//!   process steps (PutStep, MessageStep)
//!        │                    │
//! ┌──────▼────────┐   ┌───────▼───────────┐
//! │ DataManager   │   │ MessageCorrelator │
//! │ WriteCoord.   │   │  + PendingResp.   │
//! └──────┬────────┘   └───────┬───────────┘
//!        │ ReplicatedStore    │ MessageTransport
//! ┌──────▼────────────────────▼───────────┐
//! │         DHT / network layer           │
//! └───────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use hivesync::{DataManager, MemoryDht, WriteConfig, WriteRequest};
//! use std::sync::Arc;
//!
//! # async fn run() -> hivesync::Result<()> {
//! let dht = Arc::new(MemoryDht::new(5, 3));
//! let manager = DataManager::new(dht, &WriteConfig::default());
//! let stored = manager
//!     .put(WriteRequest::new("user-a", "meta", &b"..."[..]).with_version(1))
//!     .await?;
//! assert!(stored);
//! # Ok(())
//! # }
//! ```
//!
//! ### Simulator
//! ```bash
//! hivesync-sim put --deny 2 --retries 3
//! hivesync-sim request --delay 200ms --timeout 100ms
//! ```

pub mod common;
pub mod coordinator;
pub mod dht;
pub mod messaging;
pub mod process;

// Re-export commonly used types
pub use common::{Config, Error, Metrics, MessagingConfig, Result, SendFailure, WriteConfig};
pub use coordinator::{DataManager, PendingWrite, WriteCoordinator};
pub use dht::{MemoryDht, PeerId, ReplicatedStore, WriteRequest};
pub use messaging::{LoopbackTransport, Message, MessageCorrelator, MessageTransport, RecipientKey};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
