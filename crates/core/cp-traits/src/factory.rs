//! Factory trait for building per-worker processors.

use crate::processor::BoxProcessor;
use cp_error::Result;
use cp_types::WorkerId;

/// Builds a fresh processor for each worker slot.
///
/// Called once per slot while the pipeline is being built; processors are
/// never reused across slots. A failure aborts construction.
pub trait ProcessorFactory<C, V, R>: Send + Sync
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    /// Creates the processor for worker `worker`.
    fn create(&self, worker: WorkerId) -> Result<BoxProcessor<C, V, R>>;
}

impl<C, V, R, F> ProcessorFactory<C, V, R> for F
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
    F: Fn(WorkerId) -> Result<BoxProcessor<C, V, R>> + Send + Sync,
{
    fn create(&self, worker: WorkerId) -> Result<BoxProcessor<C, V, R>> {
        self(worker)
    }
}
