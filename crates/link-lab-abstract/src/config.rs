use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Construction-time parameters of a link-layer instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Size N of the sequence-number space; sequence numbers wrap mod N.
    pub num_sequence_numbers: u32,
    /// Maximum number W of outstanding unacknowledged frames.
    pub max_window: usize,
    /// Retransmission timeout in milliseconds (fixed, no backoff).
    pub timeout_ms: u64,
    /// Sleep between driver-loop iterations in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            num_sequence_numbers: 8,
            max_window: 4,
            timeout_ms: 500,
            poll_interval_ms: 10,
        }
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject parameter combinations the protocol cannot run with.
    ///
    /// N must exceed W, or an old frame and a new frame could carry the
    /// same sequence number while both are plausible at the receiver.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.max_window == 0 {
            return Err(LinkError::InvalidArgument("max_window must be at least 1"));
        }
        if self.num_sequence_numbers as usize <= self.max_window {
            return Err(LinkError::InvalidArgument(
                "num_sequence_numbers must exceed max_window",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(LinkError::InvalidArgument("timeout_ms must be nonzero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(LinkError::InvalidArgument(
                "poll_interval_ms must be nonzero",
            ));
        }
        Ok(())
    }
}

/// Partial override of [`LinkConfig`], used by scenario files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfigOverride {
    pub num_sequence_numbers: Option<u32>,
    pub max_window: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

impl LinkConfigOverride {
    pub fn apply_to(&self, config: &mut LinkConfig) {
        if let Some(v) = self.num_sequence_numbers {
            config.num_sequence_numbers = v;
        }
        if let Some(v) = self.max_window {
            config.max_window = v;
        }
        if let Some(v) = self.timeout_ms {
            config.timeout_ms = v;
        }
        if let Some(v) = self.poll_interval_ms {
            config.poll_interval_ms = v;
        }
    }
}

/// Fault model of the simulated physical channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Probability that any given frame is silently dropped.
    pub loss_rate: f64,
    /// Probability that a frame's checksum is flipped in transit.
    pub corrupt_rate: f64,
    /// RNG seed so faulty runs are reproducible.
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(LinkConfig::default().validate(), Ok(()));
    }

    #[test]
    fn window_at_least_one() {
        let config = LinkConfig {
            max_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LinkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn sequence_space_must_exceed_window() {
        let config = LinkConfig {
            num_sequence_numbers: 4,
            max_window: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LinkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn override_applies_partially() {
        let mut config = LinkConfig::default();
        let over = LinkConfigOverride {
            timeout_ms: Some(100),
            ..Default::default()
        };
        over.apply_to(&mut config);
        assert_eq!(config.timeout_ms, 100);
        assert_eq!(config.max_window, 4);
    }
}
