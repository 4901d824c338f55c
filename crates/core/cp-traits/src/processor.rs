//! Processor trait for per-worker value transformation.

use async_trait::async_trait;
use cp_error::Result;

/// Pluggable capability applied by a worker.
///
/// The worker owns the context state machine; a processor only sees a
/// context when one is absorbed and again, by reference, on every value.
/// A processor instance belongs to exactly one worker and is never shared,
/// so methods take `&mut self` and need no internal synchronization.
#[async_trait]
pub trait Processor<C, V, R>: Send
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    /// Observes a newly absorbed context.
    ///
    /// Runs before the worker records the context as current, so any latency
    /// here delays the point at which the worker becomes ready. Never fails.
    async fn absorb_context(&mut self, _context: &C) {}

    /// Combines the current context with a value.
    async fn transform(&mut self, context: &C, value: V) -> Result<R>;

    /// Returns the name of this processor for logging.
    fn name(&self) -> &str {
        "processor"
    }
}

/// Owned, type-erased processor.
pub type BoxProcessor<C, V, R> = Box<dyn Processor<C, V, R>>;
