//! Error types and classification for ctxpool.
//!
//! This crate provides:
//! - [`CpError`] - Top-level error enum for everything that can go wrong in a pipeline
//! - [`ConstructionError`] - Build-time failures reported before any data flows
//! - [`ErrorCategory`] for deciding whether a caller may retry
//!
//! Errors are `Clone` so a single terminal fault can be surfaced on the
//! result stream and recorded on the controller at the same time.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for ctxpool.
#[derive(Error, Debug, Clone)]
pub enum CpError {
    /// A worker was asked to transform a value before it absorbed any context.
    #[error("Worker {worker} received a value before any context")]
    NoContext { worker: usize },

    /// The pluggable processor failed while transforming a value.
    #[error("Processing failed on worker {worker}: {message}")]
    Processing { worker: usize, message: String },

    /// Quiescence was not reached before the deadline.
    #[error("Quiescence not reached after {waited:?}: {absorbed}/{required} workers have a context")]
    Timeout {
        waited: Duration,
        absorbed: usize,
        required: usize,
    },

    /// The pipeline could not be built.
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// The pipeline was cancelled by its owner.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// An input endpoint was used after the pipeline stopped accepting data.
    #[error("Input closed: {0}")]
    InputClosed(&'static str),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error("{0}")]
    Other(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for CpError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(Arc::new(error))
    }
}

impl CpError {
    /// Build a processing fault for the given worker.
    pub fn processing(worker: usize, message: impl Into<String>) -> Self {
        Self::Processing {
            worker,
            message: message.into(),
        }
    }

    /// Returns the worker that raised this error, if it came from a worker.
    pub fn worker(&self) -> Option<usize> {
        match self {
            Self::NoContext { worker } | Self::Processing { worker, .. } => Some(*worker),
            _ => None,
        }
    }

    /// Returns true if this is the missing-context fault.
    pub fn is_no_context(&self) -> bool {
        matches!(self, Self::NoContext { .. })
    }
}

/// Errors raised while building a pipeline, before it starts running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Pool size must be at least one
    #[error("Pool size must be at least 1, got {0}")]
    InvalidPoolSize(usize),

    /// A channel capacity was zero
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    /// The worker factory could not produce an instance
    #[error("Factory failed for worker {worker}: {message}")]
    Factory { worker: usize, message: String },
}

/// Error classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller may retry the same operation, e.g. with a longer deadline.
    Recoverable,

    /// The pipeline instance is finished; a new one must be built.
    Fatal,
}

/// Classifies an error to determine whether the caller may retry.
pub fn classify_error(error: &CpError) -> ErrorCategory {
    match error {
        CpError::Timeout { .. } => ErrorCategory::Recoverable,
        CpError::NoContext { .. }
        | CpError::Processing { .. }
        | CpError::Construction(_)
        | CpError::Cancelled
        | CpError::InputClosed(_)
        | CpError::Config(_)
        | CpError::Other(_) => ErrorCategory::Fatal,
    }
}

/// Result type alias using CpError.
pub type Result<T> = std::result::Result<T, CpError>;
