//! Network-impairment and protocol parameters.
//!
//! [`NetworkConfig`] describes one simulated link: how often frames vanish,
//! how long surviving frames take, and (optionally) how often they arrive
//! damaged.  [`ProtocolConfig`] holds the sender/receiver policy knobs.
//! Both are validated on construction so the engine never sees an
//! impossible configuration.

use std::time::Duration;

use thiserror::Error;

use crate::frame::MAX_DATA_SIZE;

/// Retransmission timeout.
pub const TIMEOUT_MS: u64 = 1000;

/// Retransmissions attempted before a message is declared lost.
pub const MAX_RETRIES: u32 = 3;

/// Errors raised when validating a configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("loss probability {0} outside [0, 1]")]
    LossProbability(f64),
    #[error("corruption probability {0} outside [0, 1]")]
    CorruptionProbability(f64),
    #[error("minimum delay {min_ms} ms exceeds maximum delay {max_ms} ms")]
    DelayRange { min_ms: u64, max_ms: u64 },
    #[error("max data size {0} outside 2..={limit}", limit = MAX_DATA_SIZE + 1)]
    DataSize(usize),
}

fn check_probability(p: f64, err: fn(f64) -> ConfigError) -> Result<f64, ConfigError> {
    // `contains` is false for NaN as well.
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(err(p))
    }
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Impairment model for one direction of the simulated network.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    loss_probability: f64,
    min_delay_ms: u64,
    max_delay_ms: u64,
    corruption_probability: f64,
}

impl NetworkConfig {
    /// Build a loss/delay model with no corruption.
    pub fn new(
        loss_probability: f64,
        min_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Result<Self, ConfigError> {
        let loss_probability = check_probability(loss_probability, ConfigError::LossProbability)?;
        if min_delay_ms > max_delay_ms {
            return Err(ConfigError::DelayRange {
                min_ms: min_delay_ms,
                max_ms: max_delay_ms,
            });
        }
        Ok(Self {
            loss_probability,
            min_delay_ms,
            max_delay_ms,
            corruption_probability: 0.0,
        })
    }

    /// Additionally damage surviving frames with probability `p`.
    pub fn with_corruption(self, p: f64) -> Result<Self, ConfigError> {
        let corruption_probability = check_probability(p, ConfigError::CorruptionProbability)?;
        Ok(Self {
            corruption_probability,
            ..self
        })
    }

    /// No loss, no delay.
    pub const fn perfect() -> Self {
        Self {
            loss_probability: 0.0,
            min_delay_ms: 0,
            max_delay_ms: 0,
            corruption_probability: 0.0,
        }
    }

    /// No loss, 10–50 ms delay.
    pub const fn ideal() -> Self {
        Self {
            loss_probability: 0.0,
            min_delay_ms: 10,
            max_delay_ms: 50,
            corruption_probability: 0.0,
        }
    }

    /// 10 % loss, 50–150 ms delay.
    pub const fn normal() -> Self {
        Self {
            loss_probability: 0.1,
            min_delay_ms: 50,
            max_delay_ms: 150,
            corruption_probability: 0.0,
        }
    }

    /// 30 % loss, 200–500 ms delay.
    pub const fn harsh() -> Self {
        Self {
            loss_probability: 0.3,
            min_delay_ms: 200,
            max_delay_ms: 500,
            corruption_probability: 0.0,
        }
    }

    pub fn loss_probability(&self) -> f64 {
        self.loss_probability
    }

    pub fn corruption_probability(&self) -> f64 {
        self.corruption_probability
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub(crate) fn delay_range_ms(&self) -> (u64, u64) {
        (self.min_delay_ms, self.max_delay_ms)
    }
}

impl Default for NetworkConfig {
    /// 10 % loss, 50–200 ms delay.
    fn default() -> Self {
        Self {
            loss_probability: 0.1,
            min_delay_ms: 50,
            max_delay_ms: 200,
            corruption_probability: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ProtocolConfig
// ---------------------------------------------------------------------------

/// What the receiver does with a valid frame whose sequence number it has
/// already accepted.
///
/// Such a duplicate means the sender never saw the previous ack.  Under
/// [`DuplicatePolicy::Discard`] the sender stays blocked until its retry
/// budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Drop the payload and acknowledge the frame again.
    #[default]
    Reack,
    /// Drop the payload silently.
    Discard,
}

/// Sender and receiver policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Time to wait for an ack before retransmitting.
    pub timeout: Duration,
    /// Retransmissions allowed per message.
    pub max_retries: u32,
    /// Message length limit; accepted messages are `1..max_data_size` bytes.
    pub max_data_size: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_DATA_SIZE + 1).contains(&self.max_data_size) {
            return Err(ConfigError::DataSize(self.max_data_size));
        }
        Ok(())
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(TIMEOUT_MS),
            max_retries: MAX_RETRIES,
            max_data_size: MAX_DATA_SIZE,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}
