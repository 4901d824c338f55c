//! cp-pipeline - Context-propagating worker pool for ctxpool.
//!
//! A pipeline has two inputs and one output:
//!
//! - Contexts are broadcast: every worker absorbs every context, in order
//! - Values are balanced: each value goes to exactly one worker, preferring
//!   idle ones
//! - Results from all workers are merged into one stream, first ready first
//!   out
//!
//! Workers hold their own current context and combine it with each value
//! they receive. The two inputs are independent, so with more than one
//! worker a value can reach a worker before any context has. That is a
//! fatal fault: the whole pipeline fails and the result stream yields the
//! error once. Callers synchronize with
//! [`PipelineHandle::await_quiescence`] before sending values.
//!
//! A pool of one worker runs in-line with the result consumer and processes
//! inputs strictly in the order they were sent.
//!
//! # Example
//!
//! ```ignore
//! use cp_pipeline::{Pipeline, RunningPipeline};
//! use cp_processor::slow_multiply_factory;
//! use futures::StreamExt;
//! use std::time::Duration;
//!
//! let pipeline = Pipeline::builder(slow_multiply_factory::<i64, i64>(Duration::from_millis(100)))
//!     .with_pool_size(10)
//!     .build()?;
//! let RunningPipeline { contexts, values, mut results, handle } = pipeline.start();
//!
//! contexts.send(10).await?;
//! handle.await_quiescence(Duration::from_secs(10)).await?;
//! values.send(2).await?;
//!
//! assert_eq!(results.next().await.transpose()?, Some(20));
//! ```

mod balance;
mod broadcast;
pub mod config;
mod control;
mod controller;
mod inputs;
mod lane;
mod merge;
mod quiescence;
pub mod stats;
pub mod worker;

pub use config::{PipelineConfig, DEFAULT_LANE_BUFFER, DEFAULT_QUIESCENCE_TIMEOUT};
pub use controller::{Pipeline, PipelineBuilder, PipelineHandle, RunningPipeline};
pub use inputs::{ContextSender, ValueSender};
pub use merge::ResultStream;
pub use stats::{LaneStats, LaneStatsSnapshot, PipelineStats, StatsSnapshot};
pub use worker::Worker;
