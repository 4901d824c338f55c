//! Trait definitions for ctxpool.
//!
//! This crate defines the seams between the pipeline and the code that
//! actually does the work:
//! - [`Processor`] - Combines a worker's current context with a value
//! - [`ProcessorFactory`] - Builds one fresh processor per worker slot

pub mod factory;
pub mod processor;

pub use factory::*;
pub use processor::*;
