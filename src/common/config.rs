//! Configuration for hivesync components
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `HIVESYNC_*` environment variables (`HIVESYNC_WRITE__MAX_PUT_RETRIES=5`).

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node ID (unique identifier)
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Replicated write settings
    #[serde(default)]
    pub write: WriteConfig,

    /// Request/response settings
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Simulated DHT settings
    #[serde(default)]
    pub dht: DhtConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Replicated write configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConfig {
    /// Retries after the initial attempt before a put is given up
    #[serde(default = "default_max_put_retries")]
    pub max_put_retries: u32,
}

fn default_max_put_retries() -> u32 {
    3
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            max_put_retries: default_max_put_retries(),
        }
    }
}

/// Request/response configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// How long a request waits for its response
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
}

fn default_response_timeout() -> u64 {
    10_000
}

impl MessagingConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout(),
        }
    }
}

/// Simulated DHT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhtConfig {
    /// Number of simulated peers
    #[serde(default = "default_peers")]
    pub peers: usize,

    /// Peers contacted per put
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Artificial completion latency
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_peers() -> usize {
    5
}
fn default_replication_factor() -> usize {
    3
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
            replication_factor: default_replication_factor(),
            latency_ms: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            write: WriteConfig::default(),
            messaging: MessagingConfig::default(),
            dht: DhtConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load defaults, an optional TOML file and `HIVESYNC_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("HIVESYNC")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dht.peers == 0 {
            return Err(Error::InvalidConfig("dht.peers must be at least 1".into()));
        }
        if self.dht.replication_factor == 0 {
            return Err(Error::InvalidConfig(
                "dht.replication_factor must be at least 1".into(),
            ));
        }
        if self.messaging.response_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "messaging.response_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.write.max_put_retries, 3);
        assert_eq!(
            config.messaging.response_timeout(),
            Duration::from_millis(10_000)
        );
        assert_eq!(config.dht.replication_factor, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
node_id = "alice"

[write]
max_put_retries = 5

[messaging]
response_timeout_ms = 250
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.node_id, "alice");
        assert_eq!(config.write.max_put_retries, 5);
        assert_eq!(config.messaging.response_timeout_ms, 250);
        assert_eq!(config.dht.peers, 5);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = Config::default();
        config.messaging.response_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
