//! Pool worker: context state plus a pluggable processor.

use cp_error::{CpError, Result};
use cp_traits::BoxProcessor;
use cp_types::{WorkerId, WorkerState};
use tracing::{trace, warn};

/// One slot of the worker pool.
///
/// Holds the most recently absorbed context and applies its processor to
/// each value using that context. State is private to the worker: nothing
/// else reads or writes it, so no synchronization is needed.
pub struct Worker<C, V, R> {
    id: WorkerId,
    state: WorkerState<C>,
    processor: BoxProcessor<C, V, R>,
}

impl<C, V, R> Worker<C, V, R>
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    /// Create a worker in the `NoContext` state.
    pub fn new(id: WorkerId, processor: BoxProcessor<C, V, R>) -> Self {
        Self {
            id,
            state: WorkerState::NoContext,
            processor,
        }
    }

    /// The worker's slot index.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The worker's current context state.
    pub fn state(&self) -> &WorkerState<C> {
        &self.state
    }

    /// Returns true once a context has been absorbed.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Records `context` as current.
    ///
    /// The processor observes the context first; the worker becomes ready
    /// only after that returns.
    pub async fn absorb(&mut self, context: C) {
        self.processor.absorb_context(&context).await;
        let replaced = self.state.absorb(context).is_some();
        trace!(worker = self.id, replaced, "Context absorbed");
    }

    /// Transforms `value` with the current context.
    ///
    /// Fails with [`CpError::NoContext`] if no context has been absorbed yet.
    pub async fn transform(&mut self, value: V) -> Result<R> {
        let Some(context) = self.state.context() else {
            warn!(worker = self.id, "Value arrived before any context");
            return Err(CpError::NoContext { worker: self.id });
        };

        trace!(
            worker = self.id,
            processor = self.processor.name(),
            "Transforming value"
        );
        self.processor.transform(context, value).await
    }
}

impl<C, V, R> std::fmt::Debug for Worker<C, V, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("ready", &matches!(self.state, WorkerState::Ready(_)))
            .finish()
    }
}
