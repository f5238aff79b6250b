//! Consumer trait for delivered results

use std::future::Future;

use async_trait::async_trait;
use eyre::Result;

/// Receives results from the delivery loop, one at a time
///
/// Each call is awaited before the next result is taken off the completed
/// stream. An error aborts delivery and fails the whole run, so consumers that
/// need to survive a bad item should handle it themselves and return `Ok`.
#[async_trait]
pub trait Consumer<T>: Send {
    /// Handle one completed result
    async fn consume(&mut self, item: T) -> Result<()>;
}

#[async_trait]
impl<T, F, Fut> Consumer<T> for F
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn consume(&mut self, item: T) -> Result<()> {
        (self)(item).await
    }
}
