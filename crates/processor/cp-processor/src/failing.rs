//! Fault-injecting processor.

use async_trait::async_trait;
use cp_error::{CpError, Result};
use cp_traits::Processor;
use cp_types::WorkerId;
use std::fmt::Debug;

/// Wraps a processor and fails whenever it sees `poison`.
///
/// Used to exercise fail-fast behavior with a fault that is not a missing
/// context.
#[derive(Debug, Clone)]
pub struct FailingProcessor<P, V> {
    inner: P,
    poison: V,
    worker: WorkerId,
}

impl<P, V> FailingProcessor<P, V> {
    /// Create a processor for `worker` that fails on `poison`.
    pub fn new(inner: P, poison: V, worker: WorkerId) -> Self {
        Self {
            inner,
            poison,
            worker,
        }
    }
}

#[async_trait]
impl<P, C, V, R> Processor<C, V, R> for FailingProcessor<P, V>
where
    P: Processor<C, V, R>,
    C: Send + Sync + 'static,
    V: PartialEq + Debug + Send + Sync + 'static,
    R: Send + 'static,
{
    async fn absorb_context(&mut self, context: &C) {
        self.inner.absorb_context(context).await;
    }

    async fn transform(&mut self, context: &C, value: V) -> Result<R> {
        if value == self.poison {
            return Err(CpError::processing(
                self.worker,
                format!("poison value {value:?}"),
            ));
        }
        self.inner.transform(context, value).await
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MultiplyProcessor;

    #[tokio::test]
    async fn test_fails_only_on_poison() {
        let mut processor = FailingProcessor::new(MultiplyProcessor, 13i64, 2);

        assert_eq!(processor.transform(&10i64, 2i64).await.unwrap(), 20);

        let err = processor.transform(&10i64, 13i64).await.unwrap_err();
        assert_eq!(err.worker(), Some(2));
        assert!(err.to_string().contains("poison value 13"));
    }
}
