//! Core types for ctxpool.
//!
//! This crate provides the small, shared vocabulary of the pipeline:
//! - [`WorkerId`] - Index of a worker slot in the pool (`0..N`)
//! - [`WorkerState`] - Per-worker context state machine
//! - [`PipelineState`] - Lifecycle of a pipeline instance

pub mod state;
pub mod worker_state;

pub use state::*;
pub use worker_state::*;

/// Index of a worker slot in the pool, `0..pool_size`.
pub type WorkerId = usize;
