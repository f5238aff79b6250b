//! Throttler error types

use thiserror::Error;

/// Errors that can occur while building or running a throttler
#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("per_time_window ({per_window}) must be less than the number of operations ({operations})")]
    WindowNotSmallerThanWork { per_window: usize, operations: usize },

    #[error("per_time_window must be at least 1")]
    ZeroPerWindow,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("concurrency ({concurrency}) must not exceed {max}")]
    ConcurrencyTooLarge { concurrency: usize, max: usize },

    #[error("time_window_secs ({0}) must be a finite, non-negative number of seconds")]
    InvalidTimeWindow(f64),

    #[error("Consumer failed after {delivered} deliveries: {cause}")]
    Consumer { delivered: u64, cause: eyre::Report },

    #[error("{task} task panicked: {message}")]
    TaskPanicked { task: &'static str, message: String },

    #[error("Concurrency gate closed")]
    GateClosed(#[from] tokio::sync::AcquireError),
}

impl ThrottleError {
    /// Check if this is a construction-time configuration error
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ThrottleError::WindowNotSmallerThanWork { .. }
                | ThrottleError::ZeroPerWindow
                | ThrottleError::ZeroConcurrency
                | ThrottleError::ConcurrencyTooLarge { .. }
                | ThrottleError::InvalidTimeWindow(_)
        )
    }
}
