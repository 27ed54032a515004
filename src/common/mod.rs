//! Common utilities and types shared across hivesync

pub mod config;
pub mod error;
pub mod gate;
pub mod hash;
pub mod metrics;
pub mod utils;

pub use config::{Config, DhtConfig, MessagingConfig, WriteConfig};
pub use error::{Error, Result, SendFailure};
pub use gate::{gate, CompletionGate, GateError, GateSignal};
pub use hash::{hrw_hash, select_replicas, short_digest};
pub use metrics::Metrics;
pub use utils::{parse_duration, timestamp_now_millis, validate_key};
