//! Protocol configuration
//!
//! Tunables of the sliding-window ARQ. Defaults: a window of 4 packets, a
//! 2 second retransmission timeout and 1 KiB datagrams.

use crate::packet::{max_payload_size, HEADER_SIZE};
use std::time::Duration;
use thiserror::Error;

/// Default sliding window size (packets)
pub const DEFAULT_WINDOW_SIZE: usize = 4;

/// Default retransmission timeout
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default pause between window admission passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default blocking receive timeout
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Default datagram size limit (bytes)
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1024;

/// Sliding-window ARQ configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArqConfig {
    /// Maximum number of unacknowledged packets in flight
    pub window_size: usize,
    /// Time after which the whole in-flight window is retransmitted
    pub retransmit_timeout: Duration,
    /// Pause of the transmit loop between admission passes
    pub poll_interval: Duration,
    /// Bound on each blocking receive, so loops can observe shutdown
    pub recv_timeout: Duration,
    /// Largest datagram sent or accepted, header included
    pub max_datagram_size: usize,
    /// Give up after this many consecutive timeouts (`None` waits forever)
    pub max_retransmissions: Option<u32>,
}

impl Default for ArqConfig {
    fn default() -> Self {
        ArqConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            max_retransmissions: None,
        }
    }
}

impl ArqConfig {
    /// Largest payload a single packet may carry
    pub fn max_payload_size(&self) -> usize {
        max_payload_size(self.max_datagram_size)
    }

    /// Check the configuration for values the protocol cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        if self.window_size > i32::MAX as usize {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        if self.retransmit_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("retransmit_timeout"));
        }
        if self.recv_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("recv_timeout"));
        }
        if self.max_datagram_size < HEADER_SIZE {
            return Err(ConfigError::DatagramTooSmall {
                size: self.max_datagram_size,
                min: HEADER_SIZE,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid window size: {0}")]
    InvalidWindowSize(usize),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Datagram size {size} is smaller than the {min}-byte header")]
    DatagramTooSmall { size: usize, min: usize },

    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid delay range: {min:?} > {max:?}")]
    InvalidDelayRange { min: Duration, max: Duration },
}
