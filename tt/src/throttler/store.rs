//! Containers passed between the admission and delivery loops

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::ThrottleError;
use crate::operation::Operation;

/// Operations waiting to be admitted, most recently pushed first
///
/// Seeded in reverse so the initial batches come out in submission order.
/// Retries pushed back on top are taken by the very next batch.
#[derive(Debug)]
pub struct PendingStore<T, E> {
    stack: Vec<Operation<T, E>>,
}

impl<T, E> PendingStore<T, E> {
    /// Seed the store from the caller's submission list
    pub fn seeded(operations: Vec<Operation<T, E>>) -> Self {
        let mut stack = operations;
        stack.reverse();
        Self { stack }
    }

    /// Put an operation on top
    pub fn push(&mut self, operation: Operation<T, E>) {
        self.stack.push(operation);
    }

    /// Take the top operation
    pub fn pop(&mut self) -> Option<Operation<T, E>> {
        self.stack.pop()
    }

    /// Take up to `size` operations, in retrieval order
    pub fn take_batch(&mut self, size: usize) -> Vec<Operation<T, E>> {
        let mut batch = Vec::with_capacity(size.min(self.stack.len()));
        while batch.len() < size {
            match self.pop() {
                Some(op) => batch.push(op),
                None => break,
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Create the completed stream, bounded at `capacity` undelivered results
pub fn completed_stream<T>(capacity: usize) -> (CompletedSender<T>, CompletedReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CompletedSender { tx }, CompletedReceiver { rx })
}

/// Producer half of the completed stream
#[derive(Debug)]
pub struct CompletedSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> CompletedSender<T> {
    /// Queue a result for delivery, waiting if the stream is full
    ///
    /// Hands the value back if the delivery side has gone away.
    pub async fn push(&self, item: T) -> Result<(), T> {
        self.tx.send(item).await.map_err(|err| err.0)
    }
}

/// Consumer half of the completed stream
#[derive(Debug)]
pub struct CompletedReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> CompletedReceiver<T> {
    /// Take the next result
    ///
    /// Returns `None` once the stream is empty and the producer half is gone.
    pub async fn pop(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// Why an operation did not produce a result
#[derive(Debug)]
pub enum Failure<E> {
    /// Operation finished with a terminal error
    Operation(E),

    /// Operation panicked while executing
    Panicked(String),

    /// Operation exceeded the configured execution bound
    TimedOut(Duration),

    /// Operation could not pass the concurrency gate
    Rejected(ThrottleError),
}

impl<E> Failure<E> {
    /// Short name of the failure variant
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Operation(_) => "operation",
            Failure::Panicked(_) => "panicked",
            Failure::TimedOut(_) => "timed_out",
            Failure::Rejected(_) => "rejected",
        }
    }

    /// The operation's own error, if that is what failed
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Failure::Operation(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Operation(err) => write!(f, "{}", err),
            Failure::Panicked(message) => write!(f, "panicked: {}", message),
            Failure::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
            Failure::Rejected(err) => write!(f, "rejected: {}", err),
        }
    }
}

/// Collected non-retry failures, handed to the caller after the run
#[derive(Debug)]
pub struct FailureSink<E> {
    failures: Vec<Failure<E>>,
}

impl<E> Default for FailureSink<E> {
    fn default() -> Self {
        Self { failures: Vec::new() }
    }
}

impl<E> FailureSink<E> {
    pub fn record(&mut self, failure: Failure<E>) {
        self.failures.push(failure);
    }

    pub fn into_vec(self) -> Vec<Failure<E>> {
        self.failures
    }
}

/// Write side of the completion flag; only the admission loop holds one
#[derive(Debug)]
pub struct CompletionSignal {
    tx: watch::Sender<bool>,
}

/// Read side of the completion flag
#[derive(Debug, Clone)]
pub struct CompletionWatch {
    rx: watch::Receiver<bool>,
}

impl CompletionSignal {
    pub fn new() -> (Self, CompletionWatch) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CompletionWatch { rx })
    }

    /// Mark that no more work will be produced; later calls are no-ops
    pub fn set(&self) {
        let changed = self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
        if changed {
            debug!("CompletionSignal::set: completion signalled");
        }
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CompletionWatch {
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }
}
