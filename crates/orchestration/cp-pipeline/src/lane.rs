//! Worker lanes: one task per worker when the pool runs in parallel, and the
//! in-line driver used for a pool of one.

use crate::control::Control;
use crate::inputs::Input;
use crate::worker::Worker;
use cp_error::CpError;
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A worker with its two input lanes.
pub(crate) struct Lane<C, V, R> {
    worker: Worker<C, V, R>,
    contexts: mpsc::Receiver<C>,
    values: mpsc::Receiver<V>,
    control: Arc<Control>,
}

impl<C, V, R> Lane<C, V, R>
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        worker: Worker<C, V, R>,
        contexts: mpsc::Receiver<C>,
        values: mpsc::Receiver<V>,
        control: Arc<Control>,
    ) -> Self {
        Self {
            worker,
            contexts,
            values,
            control,
        }
    }

    /// Run the lane on its own task, writing results to `output`.
    ///
    /// A panicking processor fails the pipeline. The output sender is only
    /// released after the failure is recorded, so the merge collector never
    /// mistakes a dead lane for a drained one.
    pub(crate) fn spawn(self, output: mpsc::Sender<R>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let worker = self.worker.id();
            let control = self.control.clone();

            let outcome = AssertUnwindSafe(self.run(&output)).catch_unwind().await;
            if let Err(panic) = outcome {
                let message = panic_message(panic.as_ref());
                error!(worker, message = %message, "Worker panicked");
                control.fail(CpError::processing(worker, format!("panicked: {message}")));
            }
            drop(output);
        })
    }

    async fn run(self, output: &mpsc::Sender<R>) {
        let Self {
            mut worker,
            mut contexts,
            mut values,
            control,
        } = self;
        let id = worker.id();
        let shutdown = control.shutdown_token().clone();
        let stats = control.stats.lane(id);

        let mut contexts_open = true;
        let mut values_open = true;

        debug!(worker = id, "Lane started");

        // Contexts and values race each other: whichever lane has an item
        // first is served first.
        while contexts_open || values_open {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                context = contexts.recv(), if contexts_open => match context {
                    Some(context) => {
                        worker.absorb(context).await;
                        control.record_absorbed(id);
                    }
                    None => contexts_open = false,
                },

                value = values.recv(), if values_open => match value {
                    Some(value) => match worker.transform(value).await {
                        Ok(result) => {
                            stats.record_value();
                            let sent = tokio::select! {
                                _ = shutdown.cancelled() => false,
                                sent = output.send(result) => sent.is_ok(),
                            };
                            if !sent {
                                break;
                            }
                        }
                        Err(e) => {
                            stats.record_failure();
                            control.fail(e);
                            break;
                        }
                    },
                    None => values_open = false,
                },
            }
        }

        debug!(
            worker = id,
            contexts = stats.contexts_absorbed(),
            values = stats.values_processed(),
            "Lane stopped"
        );
    }
}

/// Drive a single worker in-line with the result consumer.
///
/// Nothing runs until the returned stream is polled; each poll absorbs
/// contexts in arrival order until a value produces a result. A panicking
/// processor fails the pipeline and ends the stream.
pub(crate) fn inline<C, V, R>(
    worker: Worker<C, V, R>,
    input: mpsc::Receiver<Input<C, V>>,
    control: Arc<Control>,
) -> BoxStream<'static, R>
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    stream::unfold(
        (worker, input, control),
        |(mut worker, mut input, control)| async move {
            let id = worker.id();
            let step = AssertUnwindSafe(next_inline(&mut worker, &mut input, &control))
                .catch_unwind()
                .await;

            match step {
                Ok(Some(result)) => Some((result, (worker, input, control))),
                Ok(None) => None,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(worker = id, message = %message, "Worker panicked");
                    control.stats.lane(id).record_failure();
                    control.fail(CpError::processing(id, format!("panicked: {message}")));
                    None
                }
            }
        },
    )
    .boxed()
}

async fn next_inline<C, V, R>(
    worker: &mut Worker<C, V, R>,
    input: &mut mpsc::Receiver<Input<C, V>>,
    control: &Control,
) -> Option<R>
where
    C: Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    let id = worker.id();
    loop {
        match input.recv().await? {
            Input::Context(context) => {
                worker.absorb(context).await;
                control.record_absorbed(id);
            }
            Input::Value(value) => match worker.transform(value).await {
                Ok(result) => {
                    control.stats.lane(id).record_value();
                    return Some(result);
                }
                Err(e) => {
                    control.stats.lane(id).record_failure();
                    control.fail(e);
                    return None;
                }
            },
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
