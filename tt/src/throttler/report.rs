//! Run state and reporting types

use serde::Serialize;

use super::store::Failure;

/// Lifecycle of a throttler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Built, not started
    Idle,
    /// Admission loop is batching
    Running,
    /// Completion signalled, delivery loop flushing what is left
    Draining,
    /// Both loops have stopped
    Done,
}

/// Statistics for a run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ThrottlerStats {
    pub batches: u64,
    pub total_admitted: u64,
    pub total_completed: u64,
    pub total_retried: u64,
    pub total_failed: u64,
    pub total_delivered: u64,
    pub peak_concurrent: usize,
}

/// What the admission loop did
#[derive(Debug)]
pub struct AdmissionSummary<E> {
    pub batches: u64,
    pub admitted: u64,
    pub completed: u64,
    pub retried: u64,
    pub failures: Vec<Failure<E>>,
    /// False if the loop stopped early because delivery went away
    pub exhausted: bool,
}

/// What the delivery loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub delivered: u64,
}

/// Result of a finished run: both top-level tasks and the failure sink
#[derive(Debug)]
pub struct RunReport<E> {
    pub admission: AdmissionSummary<E>,
    pub delivery: DeliverySummary,
    pub stats: ThrottlerStats,
}

impl<E> RunReport<E> {
    pub(crate) fn new(admission: AdmissionSummary<E>, delivery: DeliverySummary, peak_concurrent: usize) -> Self {
        let stats = ThrottlerStats {
            batches: admission.batches,
            total_admitted: admission.admitted,
            total_completed: admission.completed,
            total_retried: admission.retried,
            total_failed: admission.failures.len() as u64,
            total_delivered: delivery.delivered,
            peak_concurrent,
        };
        Self {
            admission,
            delivery,
            stats,
        }
    }

    /// Non-retry failures collected during the run
    pub fn failures(&self) -> &[Failure<E>] {
        &self.admission.failures
    }

    /// Take ownership of the collected failures
    pub fn into_failures(self) -> Vec<Failure<E>> {
        self.admission.failures
    }
}
