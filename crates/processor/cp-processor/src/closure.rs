//! Closure-backed processor.

use async_trait::async_trait;
use cp_error::Result;
use cp_traits::Processor;

/// Adapts a synchronous combine function into a [`Processor`].
pub struct FnProcessor<F> {
    combine: F,
    name: String,
}

impl<F> FnProcessor<F> {
    /// Create a processor that calls `combine(context, value)` for every value.
    pub fn new(combine: F) -> Self {
        Self {
            combine,
            name: "fn".to_string(),
        }
    }

    /// Sets the name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, C, V, R> Processor<C, V, R> for FnProcessor<F>
where
    F: FnMut(&C, V) -> Result<R> + Send,
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    async fn transform(&mut self, context: &C, value: V) -> Result<R> {
        (self.combine)(context, value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
