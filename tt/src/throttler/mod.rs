//! Batch-and-gate throttler
//!
//! Admits operations in paced batches, bounds how many execute at once,
//! re-queues throttled work and streams results to a consumer.

mod config;
mod core;
mod gate;
mod report;
mod store;

pub use config::ThrottlerConfig;
pub use self::core::Throttler;
pub use gate::{ConcurrencyGate, GatePermit};
pub use report::{AdmissionSummary, DeliverySummary, EngineState, RunReport, ThrottlerStats};
pub use store::{
    CompletedReceiver, CompletedSender, CompletionSignal, CompletionWatch, Failure, FailureSink, PendingStore,
    completed_stream,
};
