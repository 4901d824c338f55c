//! Common utilities for integration tests.

use cp_error::Result;
use cp_pipeline::{Pipeline, PipelineHandle, ResultStream, RunningPipeline};
use cp_processor::slow_multiply_factory;
use futures::StreamExt;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A running pool of `workers` slow multiplying workers.
pub fn slow_pipeline(workers: usize, slowness: Duration) -> RunningPipeline<i64, i64, i64> {
    init_tracing();
    Pipeline::builder(slow_multiply_factory::<i64, i64>(slowness))
        .with_pool_size(workers)
        .build()
        .expect("pipeline builds")
        .start()
}

/// Collect every item the result stream yields until it ends.
pub async fn collect_all(results: &mut ResultStream<i64>) -> Vec<Result<i64>> {
    let mut items = Vec::new();
    while let Some(item) = results.next().await {
        items.push(item);
    }
    items
}

/// Number of workers that have absorbed at least one context.
pub fn workers_with_context(handle: &PipelineHandle) -> usize {
    handle
        .stats()
        .lanes
        .iter()
        .filter(|lane| lane.contexts_absorbed > 0)
        .count()
}
