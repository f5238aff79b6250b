//! Throttler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::ThrottleError;

/// Throttler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottlerConfig {
    /// Pacing interval between batches, and backoff after a retry, in seconds
    ///
    /// Fractional values are allowed, e.g. `0.25`.
    #[serde(default = "default_time_window_secs")]
    pub time_window_secs: f64,

    /// Max operations admitted per batch
    #[serde(default = "default_per_time_window")]
    pub per_time_window: usize,

    /// Max operations executing at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Optional execution bound per operation, in seconds
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

fn default_time_window_secs() -> f64 {
    60.0
}

fn default_per_time_window() -> usize {
    100
}

fn default_concurrency() -> usize {
    5
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 60.0,
            per_time_window: 100,
            concurrency: 5,
            operation_timeout_secs: None,
        }
    }
}

impl ThrottlerConfig {
    /// Get the time window as a Duration
    ///
    /// Values rejected by [`validate`](Self::validate) map to zero.
    pub fn time_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_window_secs).unwrap_or_default()
    }

    /// Get the per-operation timeout as a Duration
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }

    /// Check the configuration against the amount of work it will throttle
    ///
    /// Batches must be strictly smaller than the initial work list, otherwise
    /// there is nothing to throttle.
    pub fn validate(&self, operations: usize) -> Result<(), ThrottleError> {
        if self.concurrency == 0 {
            return Err(ThrottleError::ZeroConcurrency);
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ThrottleError::ConcurrencyTooLarge {
                concurrency: self.concurrency,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if Duration::try_from_secs_f64(self.time_window_secs).is_err() {
            return Err(ThrottleError::InvalidTimeWindow(self.time_window_secs));
        }
        if self.per_time_window == 0 {
            return Err(ThrottleError::ZeroPerWindow);
        }
        if self.per_time_window >= operations {
            return Err(ThrottleError::WindowNotSmallerThanWork {
                per_window: self.per_time_window,
                operations,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ThrottlerConfig::default();
        assert_eq!(config.time_window_secs, 60.0);
        assert_eq!(config.per_time_window, 100);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.operation_timeout_secs, None);
    }

    #[test]
    fn test_time_window_duration() {
        let config = ThrottlerConfig {
            time_window_secs: 120.0,
            ..Default::default()
        };
        assert_eq!(config.time_window(), Duration::from_secs(120));
        assert_eq!(config.operation_timeout(), None);

        let config = ThrottlerConfig {
            time_window_secs: 0.25,
            ..Default::default()
        };
        assert_eq!(config.time_window(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_window_against_work() {
        let config = ThrottlerConfig {
            per_time_window: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(10),
            Err(ThrottleError::WindowNotSmallerThanWork {
                per_window: 10,
                operations: 10
            })
        ));
        assert!(config.validate(11).is_ok());

        let config = ThrottlerConfig {
            per_time_window: 9,
            ..Default::default()
        };
        assert!(config.validate(10).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = ThrottlerConfig {
            concurrency: 0,
            per_time_window: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(5), Err(ThrottleError::ZeroConcurrency)));

        let config = ThrottlerConfig {
            per_time_window: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(5), Err(ThrottleError::ZeroPerWindow)));
    }

    #[test]
    fn test_validate_rejects_concurrency_above_semaphore_limit() {
        let config = ThrottlerConfig {
            concurrency: usize::MAX,
            per_time_window: 2,
            ..Default::default()
        };
        let err = config.validate(3).unwrap_err();
        assert!(err.is_config());
        assert!(matches!(
            err,
            ThrottleError::ConcurrencyTooLarge {
                concurrency: usize::MAX,
                max: Semaphore::MAX_PERMITS
            }
        ));

        let config = ThrottlerConfig {
            concurrency: Semaphore::MAX_PERMITS,
            per_time_window: 2,
            ..Default::default()
        };
        assert!(config.validate(3).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_time_window() {
        for window in [-1.0, f64::NAN, f64::INFINITY] {
            let config = ThrottlerConfig {
                time_window_secs: window,
                per_time_window: 2,
                ..Default::default()
            };
            assert!(matches!(config.validate(3), Err(ThrottleError::InvalidTimeWindow(_))));
            assert_eq!(config.time_window(), Duration::ZERO);
        }
    }

    #[test]
    fn test_validate_empty_work() {
        let config = ThrottlerConfig {
            per_time_window: 1,
            ..Default::default()
        };
        assert!(config.validate(0).is_err());
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let config: ThrottlerConfig = serde_yaml::from_str("per_time_window: 20\noperation_timeout_secs: 30\n").unwrap();
        assert_eq!(config.per_time_window, 20);
        assert_eq!(config.time_window_secs, 60.0);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.operation_timeout(), Some(Duration::from_secs(30)));
    }
}
