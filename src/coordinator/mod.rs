//! Replicated writes with quorum verification
//!
//! - Quorum evaluation of per-peer put answers
//! - Bounded, strictly sequential retries with compensating removals
//! - A blocking-style verdict for callers

pub mod data_manager;
pub mod quorum;
pub mod write;

pub use data_manager::DataManager;
pub use quorum::{evaluate, is_quorum, QuorumDecision};
pub use write::{PendingWrite, WriteCoordinator};
