//! Per-session configuration supplied when a session is created.

use std::time::Duration;

use thiserror::Error;

/// Static protocol parameters.  The window is never adapted to loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of packets in flight, and the receive-window span.
    pub window: usize,
    /// Age after which an unacknowledged packet is retransmitted.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: 1,
            timeout: Duration::from_millis(2000),
        }
    }
}

impl Config {
    /// Build a validated configuration.
    pub fn new(window: usize, timeout: Duration) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { window, timeout })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("window must allow at least one packet in flight")]
    ZeroWindow,
    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,
}
