//! Heartbeat configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the heartbeat checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// How often the checker wakes up, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Silence longer than this is treated as a dead entity, in milliseconds
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_threshold_ms() -> u64 {
    10_000
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            threshold_ms: 10_000,
        }
    }
}

impl HeartbeatConfig {
    /// Get the check interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get the staleness threshold as a Duration
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    /// Upper bound on how long a silent entity survives: one threshold plus
    /// one check interval
    pub fn detection_bound(&self) -> Duration {
        self.threshold() + self.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.threshold_ms, 10_000);
    }

    #[test]
    fn test_durations() {
        let config = HeartbeatConfig {
            interval_ms: 250,
            threshold_ms: 2000,
        };
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.threshold(), Duration::from_secs(2));
        assert_eq!(config.detection_bound(), Duration::from_millis(2250));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: HeartbeatConfig = serde_yaml::from_str("interval_ms: 500").unwrap();
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.threshold_ms, 10_000);
    }
}
