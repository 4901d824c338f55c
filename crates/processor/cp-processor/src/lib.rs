//! Built-in processors for ctxpool pipelines.
//!
//! - [`MultiplyProcessor`] - Production variant: `context * value`
//! - [`SlowProcessor`] - Adds a fixed latency to context absorption of any inner processor
//! - [`FnProcessor`] - Adapts a closure into a processor
//! - [`FailingProcessor`] - Raises a processing fault on a chosen value
//!
//! The `*_factory` helpers build [`ProcessorFactory`] values for the common
//! cases so callers do not have to spell out the boxing.
//!
//! # Example
//!
//! ```rust,ignore
//! use cp_processor::slow_multiply_factory;
//! use std::time::Duration;
//!
//! let factory = slow_multiply_factory::<i64, i64>(Duration::from_millis(100));
//! let pipeline = Pipeline::builder(factory).with_pool_size(10).build()?;
//! ```

mod closure;
mod failing;
mod multiply;
mod slow;

pub use closure::FnProcessor;
pub use failing::FailingProcessor;
pub use multiply::MultiplyProcessor;
pub use slow::SlowProcessor;

use cp_error::Result;
use cp_traits::{BoxProcessor, ProcessorFactory};
use cp_types::WorkerId;
use std::fmt::Debug;
use std::ops::Mul;
use std::time::Duration;

/// Factory producing a [`MultiplyProcessor`] per worker.
pub fn multiply_factory<C, V>() -> impl ProcessorFactory<C, V, <C as Mul<V>>::Output>
where
    C: Mul<V> + Clone + Send + Sync + 'static,
    V: Send + 'static,
    <C as Mul<V>>::Output: Send + 'static,
{
    |_worker: WorkerId| -> Result<BoxProcessor<C, V, <C as Mul<V>>::Output>> {
        Ok(Box::new(MultiplyProcessor))
    }
}

/// Factory producing a [`SlowProcessor`] around a [`MultiplyProcessor`] per worker.
///
/// This is the reference behavior: every context takes `slowness` to absorb,
/// values are multiplied by the current context.
pub fn slow_multiply_factory<C, V>(
    slowness: Duration,
) -> impl ProcessorFactory<C, V, <C as Mul<V>>::Output>
where
    C: Mul<V> + Clone + Debug + Send + Sync + 'static,
    V: Debug + Send + 'static,
    <C as Mul<V>>::Output: Send + 'static,
{
    move |worker: WorkerId| -> Result<BoxProcessor<C, V, <C as Mul<V>>::Output>> {
        Ok(Box::new(
            SlowProcessor::new(MultiplyProcessor, slowness).with_worker(worker),
        ))
    }
}
