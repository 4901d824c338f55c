//! Merge collector and the pipeline's result stream.

use crate::control::Control;
use cp_error::Result;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Fan worker output lanes in to one stream, first ready first out.
pub(crate) fn merge_lanes<R>(lanes: Vec<mpsc::Receiver<R>>) -> BoxStream<'static, R>
where
    R: Send + 'static,
{
    let lanes = lanes
        .into_iter()
        .map(|mut rx| stream::poll_fn(move |cx| rx.poll_recv(cx)));
    stream::select_all(lanes).boxed()
}

/// The result-output endpoint.
///
/// Yields every result the workers produce. If the pipeline fails, the
/// stream yields that failure exactly once and then ends; results still
/// buffered in worker lanes at that point are discarded. A stream that runs
/// to its end without a failure moves the pipeline to `Completed`.
///
/// Dropping the stream before it ends cancels the pipeline.
pub struct ResultStream<R> {
    inner: BoxStream<'static, R>,
    cancelled: BoxFuture<'static, ()>,
    control: Arc<Control>,
    done: bool,
}

impl<R> ResultStream<R>
where
    R: Send + 'static,
{
    pub(crate) fn new(inner: BoxStream<'static, R>, control: Arc<Control>) -> Self {
        let shutdown = control.shutdown_token().clone();
        Self {
            inner,
            cancelled: async move { shutdown.cancelled().await }.boxed(),
            control,
            done: false,
        }
    }

    fn finish(&mut self) -> Poll<Option<Result<R>>> {
        self.done = true;
        match self.control.failure() {
            Some(error) => Poll::Ready(Some(Err(error))),
            None => {
                self.control.mark_completed();
                Poll::Ready(None)
            }
        }
    }
}

impl<R> Stream for ResultStream<R>
where
    R: Send + 'static,
{
    type Item = Result<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        if this.control.failure().is_some() || this.cancelled.poll_unpin(cx).is_ready() {
            return this.finish();
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(result)) => Poll::Ready(Some(Ok(result))),
            Poll::Ready(None) => this.finish(),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> Drop for ResultStream<R> {
    fn drop(&mut self) {
        if !self.done && self.control.cancel() {
            debug!("Result stream dropped before the end");
        }
    }
}

impl<R> std::fmt::Debug for ResultStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("done", &self.done)
            .finish()
    }
}
