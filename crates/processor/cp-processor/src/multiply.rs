//! Multiplying processor.

use async_trait::async_trait;
use cp_error::Result;
use cp_traits::Processor;
use std::ops::Mul;

/// Combines a context and a value by multiplication.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplyProcessor;

#[async_trait]
impl<C, V> Processor<C, V, <C as Mul<V>>::Output> for MultiplyProcessor
where
    C: Mul<V> + Clone + Send + Sync + 'static,
    V: Send + 'static,
    <C as Mul<V>>::Output: Send + 'static,
{
    async fn transform(&mut self, context: &C, value: V) -> Result<<C as Mul<V>>::Output> {
        Ok(context.clone() * value)
    }

    fn name(&self) -> &str {
        "multiply"
    }
}
