//! Processor decorator with configurable absorb latency.

use async_trait::async_trait;
use cp_error::Result;
use cp_traits::Processor;
use cp_types::WorkerId;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// Wraps a processor and makes every context absorption take `slowness`.
///
/// The worker only becomes ready once absorption returns, so this widens the
/// window in which a value can reach a worker that has not yet got a context.
#[derive(Debug, Clone)]
pub struct SlowProcessor<P> {
    inner: P,
    slowness: Duration,
    worker: Option<WorkerId>,
}

impl<P> SlowProcessor<P> {
    /// Create a new slow processor around `inner`.
    pub fn new(inner: P, slowness: Duration) -> Self {
        Self {
            inner,
            slowness,
            worker: None,
        }
    }

    /// Tag log events with the owning worker.
    pub fn with_worker(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    /// The configured absorb latency.
    pub fn slowness(&self) -> Duration {
        self.slowness
    }
}

#[async_trait]
impl<P, C, V, R> Processor<C, V, R> for SlowProcessor<P>
where
    P: Processor<C, V, R>,
    C: Debug + Send + Sync + 'static,
    V: Debug + Send + 'static,
    R: Send + 'static,
{
    async fn absorb_context(&mut self, context: &C) {
        debug!(worker = ?self.worker, context = ?context, "Context");
        if !self.slowness.is_zero() {
            tokio::time::sleep(self.slowness).await;
        }
        self.inner.absorb_context(context).await;
    }

    async fn transform(&mut self, context: &C, value: V) -> Result<R> {
        debug!(worker = ?self.worker, value = ?value, "Value");
        self.inner.transform(context, value).await
    }

    fn name(&self) -> &str {
        "slow"
    }
}
