//! Operations and their outcomes
//!
//! An [`Operation`] is a boxed future that resolves to an [`Outcome`]. A throttled
//! operation answers with [`Outcome::Retry`], handing back a fresh replacement
//! that is re-queued and admitted again after a full window of backoff.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;

/// Result of driving an operation to completion
pub enum Outcome<T, E> {
    /// Operation produced a value for the consumer
    Success(T),

    /// Operation was throttled; run the replacement later
    Retry(Operation<T, E>),

    /// Operation failed for good
    Failure(E),
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => f.debug_tuple("Success").field(value).finish(),
            Outcome::Retry(op) => f.debug_tuple("Retry").field(op).finish(),
            Outcome::Failure(err) => f.debug_tuple("Failure").field(err).finish(),
        }
    }
}

/// A unit of asynchronous work, driven to completion exactly once
pub struct Operation<T, E> {
    name: Option<String>,
    future: BoxFuture<'static, Outcome<T, E>>,
}

impl<T, E> Operation<T, E> {
    /// Wrap a future resolving to an [`Outcome`]
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Outcome<T, E>> + Send + 'static,
    {
        Self {
            name: None,
            future: future.boxed(),
        }
    }

    /// Wrap a future and give it a name for diagnostics
    pub fn named<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Outcome<T, E>> + Send + 'static,
    {
        Self {
            name: Some(name.into()),
            future: future.boxed(),
        }
    }

    /// Wrap a future resolving to a plain `Result`
    ///
    /// `Ok` becomes [`Outcome::Success`] and `Err` becomes [`Outcome::Failure`];
    /// such an operation never asks to be retried.
    pub fn from_result<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: 'static,
        E: 'static,
    {
        Self::new(future.map(Outcome::from))
    }

    /// Name given at construction, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for log output
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl<T, E> Future for Operation<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl<T, E> fmt::Debug for Operation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish_non_exhaustive()
    }
}
