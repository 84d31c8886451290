//! Configuration file support for RDoUT CLI tools
//!
//! Every table and field is optional; missing values fall back to the
//! library defaults. Durations are given in milliseconds.

use rdout::{ArqConfig, FaultConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// `[arq]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArqSection {
    /// Maximum packets in flight
    pub window_size: usize,
    /// Retransmission timeout
    pub retransmit_timeout_ms: u64,
    /// Pause between window admission passes
    pub poll_interval_ms: u64,
    /// Bound on each blocking receive
    pub recv_timeout_ms: u64,
    /// Largest datagram, header included
    pub max_datagram_size: usize,
    /// Give up after this many consecutive timeouts
    pub max_retransmissions: Option<u32>,
}

impl Default for ArqSection {
    fn default() -> Self {
        ArqSection::from(&ArqConfig::default())
    }
}

impl From<&ArqConfig> for ArqSection {
    fn from(config: &ArqConfig) -> Self {
        ArqSection {
            window_size: config.window_size,
            retransmit_timeout_ms: millis(config.retransmit_timeout),
            poll_interval_ms: millis(config.poll_interval),
            recv_timeout_ms: millis(config.recv_timeout),
            max_datagram_size: config.max_datagram_size,
            max_retransmissions: config.max_retransmissions,
        }
    }
}

impl ArqSection {
    /// Convert to the library configuration
    pub fn to_arq_config(&self) -> ArqConfig {
        ArqConfig {
            window_size: self.window_size,
            retransmit_timeout: Duration::from_millis(self.retransmit_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
            max_datagram_size: self.max_datagram_size,
            max_retransmissions: self.max_retransmissions,
        }
    }
}

/// `[faults]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSection {
    /// Drop probability
    pub loss_rate: f64,
    /// Corruption probability
    pub corrupt_rate: f64,
    /// Lower delivery delay bound
    pub min_delay_ms: u64,
    /// Upper delivery delay bound
    pub max_delay_ms: u64,
    /// Fixed RNG seed
    pub seed: Option<u64>,
}

impl Default for FaultSection {
    fn default() -> Self {
        FaultSection::from(&FaultConfig::default())
    }
}

impl From<&FaultConfig> for FaultSection {
    fn from(config: &FaultConfig) -> Self {
        FaultSection {
            loss_rate: config.loss_rate,
            corrupt_rate: config.corrupt_rate,
            min_delay_ms: millis(config.min_delay),
            max_delay_ms: millis(config.max_delay),
            seed: config.seed,
        }
    }
}

impl FaultSection {
    /// Convert to the library configuration
    pub fn to_fault_config(&self) -> FaultConfig {
        FaultConfig {
            loss_rate: self.loss_rate,
            corrupt_rate: self.corrupt_rate,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            seed: self.seed,
        }
    }
}

/// `[sender]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSection {
    /// Input source (file path or "-" for stdin), one payload per line
    pub input: String,
    /// Receiver address
    pub peer: SocketAddr,
    /// Local bind address
    pub bind: SocketAddr,
}

impl Default for SenderSection {
    fn default() -> Self {
        SenderSection {
            input: "-".to_string(),
            peer: SocketAddr::from(([127, 0, 0, 1], 8888)),
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
        }
    }
}

/// `[receiver]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverSection {
    /// Output destination (file path or "-" for stdout)
    pub output: String,
    /// Listen address
    pub listen: SocketAddr,
}

impl Default for ReceiverSection {
    fn default() -> Self {
        ReceiverSection {
            output: "-".to_string(),
            listen: SocketAddr::from(([127, 0, 0, 1], 8888)),
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub arq: ArqSection,
    pub faults: FaultSection,
    pub sender: SenderSection,
    pub receiver: ReceiverSection,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Config::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Load from `path` if given, otherwise use the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Configuration of the lossy demonstration link
    pub fn example_lossy() -> Self {
        Config {
            faults: FaultSection::from(&FaultConfig::lossy()),
            ..Config::default()
        }
    }

    /// Check the protocol and fault settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arq
            .to_arq_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.faults
            .to_fault_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn arq_config(&self) -> ArqConfig {
        self.arq.to_arq_config()
    }

    pub fn fault_config(&self) -> FaultConfig {
        self.faults.to_fault_config()
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

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.arq_config(), ArqConfig::default());
        assert_eq!(config.fault_config(), FaultConfig::default());
        assert_eq!(config.sender.input, "-");
    }

    #[test]
    fn test_partial_tables() {
        let config = Config::from_toml(
            r#"
            [arq]
            window_size = 8
            retransmit_timeout_ms = 250

            [faults]
            loss_rate = 0.3
            max_delay_ms = 50
            seed = 7

            [receiver]
            listen = "127.0.0.1:9999"
            "#,
        )
        .unwrap();

        let arq = config.arq_config();
        assert_eq!(arq.window_size, 8);
        assert_eq!(arq.retransmit_timeout, Duration::from_millis(250));
        assert_eq!(arq.max_datagram_size, 1024);

        let faults = config.fault_config();
        assert_eq!(faults.loss_rate, 0.3);
        assert_eq!(faults.max_delay, Duration::from_millis(50));
        assert_eq!(faults.seed, Some(7));
        assert_eq!(config.receiver.listen.port(), 9999);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[arq]\nwindow_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("[faults]\nloss_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("[faults]\nmin_delay_ms = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("rdout-config-{}.toml", std::process::id()));
        let mut config = Config::example_lossy();
        config.arq.window_size = 8;
        config.faults.seed = Some(7);

        config.to_file(&path).unwrap();
        let loaded = Config::load(Some(path.as_path())).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
        assert_eq!(loaded.fault_config().seed, Some(7));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::example_lossy();
        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.fault_config().min_delay, Duration::from_millis(100));
    }
}
