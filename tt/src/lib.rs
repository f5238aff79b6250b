//! TaskThrottle - batch-and-gate throttling for async operations
//!
//! Runs a fixed list of async operations under two limits at once: at most
//! `per_time_window` operations are admitted per window, and at most
//! `concurrency` of them execute simultaneously. An operation that hits an
//! upstream rate limit answers with [`Outcome::Retry`] and a replacement; the
//! replacement is re-queued and the whole admission loop backs off for a window.
//! Results are streamed to a [`Consumer`] as they complete.
//!
//! # Example
//!
//! ```ignore
//! use taskthrottle::{Operation, Outcome, Throttler, ThrottlerConfig};
//!
//! let ops = urls
//!     .into_iter()
//!     .map(|url| Operation::new(async move {
//!         match fetch(&url).await {
//!             Ok(body) => Outcome::Success(body),
//!             Err(e) if e.is_rate_limit() => Outcome::Retry(retry_fetch(url)),
//!             Err(e) => Outcome::Failure(e),
//!         }
//!     }))
//!     .collect();
//!
//! let throttler = Throttler::new(ops, consumer, ThrottlerConfig::default(), Handle::current())?;
//! let report = throttler.run().await?;
//! ```

pub mod cli;
pub mod config;
pub mod consumer;
pub mod demo;
pub mod error;
pub mod operation;
pub mod throttler;

pub use config::{Config, DemoConfig};
pub use consumer::Consumer;
pub use error::ThrottleError;
pub use operation::{Operation, Outcome};
pub use throttler::{
    ConcurrencyGate, EngineState, Failure, RunReport, Throttler, ThrottlerConfig, ThrottlerStats,
};
