use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

fn default_delay() -> Duration {
    Duration::from_secs(6)
}

fn default_max_attempts() -> u32 {
    100
}

/// Polling cadence for a waiter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaiterConfig {
    #[serde(
        rename = "delay_secs",
        default = "default_delay",
        with = "duration_secs"
    )]
    pub delay: Duration,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Fixed-interval polling loop with an attempt budget.
#[derive(Debug, Clone)]
pub struct Waiter {
    name: String,
    config: WaiterConfig,
}

impl Waiter {
    pub fn new(name: impl Into<String>, config: WaiterConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll until `poll` reports `true`.
    ///
    /// Cancellation is observed before every attempt and while sleeping; a
    /// poll already in flight runs to completion. Errors from `poll` end the
    /// wait immediately. Returns the number of attempts made.
    pub async fn wait<F, Fut>(&self, cancel: &CancellationToken, mut poll: F) -> Result<u32, LaunchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, LaunchError>>,
    {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(LaunchError::Cancelled);
            }

            if poll().await? {
                debug!(waiter = %self.name, attempt, "waiter satisfied");
                return Ok(attempt);
            }

            if attempt == max_attempts {
                break;
            }

            debug!(waiter = %self.name, attempt, delay = ?self.config.delay, "not complete, sleeping");
            tokio::select! {
                _ = cancel.cancelled() => return Err(LaunchError::Cancelled),
                _ = tokio::time::sleep(self.config.delay) => {}
            }
        }

        Err(LaunchError::WaiterExhausted {
            waiter: self.name.clone(),
            attempts: max_attempts,
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("invalid delay_secs {}: {}", secs, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_aws_waiters() {
        let config = WaiterConfig::default();
        assert_eq!(config.delay, Duration::from_secs(6));
        assert_eq!(config.max_attempts, 100);
    }

    #[test]
    fn parses_fractional_delay() {
        let config: WaiterConfig = serde_yaml::from_str("delay_secs: 0.5\nmax_attempts: 3\n").unwrap();
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn rejects_negative_delay() {
        let result: Result<WaiterConfig, _> = serde_yaml::from_str("delay_secs: -1\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_delay_too_large_for_duration() {
        let result: Result<WaiterConfig, _> = serde_yaml::from_str("delay_secs: 1e20\n");
        assert!(result.is_err());
    }
}
