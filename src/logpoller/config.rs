use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Log poller settings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Interval between ticks.
    #[serde(with = "serde_millis")]
    pub poll_period: Duration,
    /// The number of transactions requested per account page.
    pub page_size: u32,
    /// Default lifetime of stored logs.
    #[serde(with = "serde_millis")]
    pub log_retention: Duration,
    /// The number of masterchain blocks which must be produced on top of
    /// a block before it is processed.
    pub block_confirmations: u32,
    /// Timeout for a temporarily unavailable block to appear.
    #[serde(with = "serde_millis")]
    pub block_wait_timeout: Duration,
    /// Maximum number of accounts or shard blocks scanned at once.
    pub max_concurrent_scans: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(3),
            page_size: 100,
            log_retention: Duration::from_secs(24 * 60 * 60),
            block_confirmations: 0,
            block_wait_timeout: Duration::from_secs(5),
            max_concurrent_scans: 16,
        }
    }
}

mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_json() {
        let config: PollerConfig = serde_json::from_str(r#"{"poll_period":500}"#).unwrap();
        assert_eq!(config.poll_period, Duration::from_millis(500));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.log_retention, Duration::from_secs(86_400));

        let json = serde_json::to_value(PollerConfig::default()).unwrap();
        assert_eq!(json["poll_period"], 3000);
        assert_eq!(json["block_wait_timeout"], 5000);
        let parsed: PollerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, PollerConfig::default());
    }
}
