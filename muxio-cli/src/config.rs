//! Configuration file support for muxio CLI tools

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Input source (file path or "-" for stdin)
    pub input: String,
    /// Destination URL (`udp://host:port?opt=val`)
    pub url: String,
    /// Bytes read per datagram
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Statistics interval in seconds
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

fn default_chunk_size() -> usize {
    1316
}

fn default_stats_interval() -> u64 {
    1
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Output destination (file path or "-" for stdout)
    pub output: String,
    /// Listen URL (`udp://group:port?opt=val` or `udp://:port`)
    pub url: String,
    /// Statistics interval in seconds
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

/// Combined configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sender configuration
    pub sender: Option<SenderConfig>,
    /// Receiver configuration
    pub receiver: Option<ReceiverConfig>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create example sender configuration
    pub fn example_sender() -> Self {
        Config {
            sender: Some(SenderConfig {
                input: "-".to_string(),
                url: "udp://239.255.0.1:7400?ttl=4".to_string(),
                chunk_size: 1316,
                stats_interval_secs: 1,
            }),
            receiver: None,
        }
    }

    /// Create example receiver configuration
    pub fn example_receiver() -> Self {
        Config {
            sender: None,
            receiver: Some(ReceiverConfig {
                output: "-".to_string(),
                url: "udp://239.255.0.1:7400".to_string(),
                stats_interval_secs: 1,
            }),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl SenderConfig {
    /// Get statistics interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl ReceiverConfig {
    /// Get statistics interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_configs() {
        let sender_config = Config::example_sender();
        assert!(sender_config.sender.is_some());

        let receiver_config = Config::example_receiver();
        assert!(receiver_config.receiver.is_some());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::example_sender();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert!(parsed.sender.is_some());
        assert_eq!(parsed.sender.unwrap().chunk_size, 1316);
    }

    #[test]
    fn test_chunk_size_default() {
        let parsed: Config = toml::from_str(
            "[sender]\ninput = \"-\"\nurl = \"udp://127.0.0.1:9000\"\n",
        )
        .unwrap();
        assert_eq!(parsed.sender.unwrap().chunk_size, 1316);
    }
}
