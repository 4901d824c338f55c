//! Pipeline controller: builds the topology, starts it, and exposes its
//! lifecycle to the caller.

use crate::balance::BalancedDistributor;
use crate::broadcast::BroadcastDistributor;
use crate::config::PipelineConfig;
use crate::control::Control;
use crate::inputs::{ContextSender, Input, ValueSender};
use crate::lane::{self, Lane};
use crate::merge::{merge_lanes, ResultStream};
use crate::quiescence::Progress;
use crate::stats::StatsSnapshot;
use crate::worker::Worker;
use cp_error::{ConstructionError, CpError, Result};
use cp_traits::ProcessorFactory;
use cp_types::PipelineState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder<C, V, R> {
    config: PipelineConfig,
    factory: Arc<dyn ProcessorFactory<C, V, R>>,
}

impl<C, V, R> PipelineBuilder<C, V, R>
where
    C: Clone + Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    /// Create a builder with the default configuration.
    pub fn new(factory: impl ProcessorFactory<C, V, R> + 'static) -> Self {
        Self {
            config: PipelineConfig::default(),
            factory: Arc::new(factory),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of workers.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.config = self.config.with_pool_size(size);
        self
    }

    /// Set the per-lane buffer size.
    pub fn with_lane_buffer(mut self, size: usize) -> Self {
        self.config = self.config.with_lane_buffer(size);
        self
    }

    /// Set the default quiescence deadline.
    pub fn with_quiescence_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_quiescence_timeout(timeout);
        self
    }

    /// Validate the configuration, create one worker per slot, and wire the
    /// topology. No data flows until [`Pipeline::start`].
    pub fn build(self) -> std::result::Result<Pipeline<C, V, R>, ConstructionError> {
        let config = self.config;
        if config.pool_size == 0 {
            return Err(ConstructionError::InvalidPoolSize(config.pool_size));
        }
        config.validate().map_err(ConstructionError::InvalidBuffer)?;

        let workers = (0..config.pool_size)
            .map(|id| {
                self.factory
                    .create(id)
                    .map(|processor| Worker::new(id, processor))
                    .map_err(|e| ConstructionError::Factory {
                        worker: id,
                        message: e.to_string(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let control = Arc::new(Control::new(config.pool_size, config.is_inline()));
        let topology = if config.is_inline() {
            Topology::inline(workers, &config)
        } else {
            Topology::parallel(workers, &config)
        };

        debug!(
            pool_size = config.pool_size,
            inline = config.is_inline(),
            "Pipeline built"
        );

        Ok(Pipeline {
            config,
            control,
            topology,
        })
    }
}

/// One pool slot: a worker and the lane endpoints wired to it.
struct WorkerSlot<C, V, R> {
    worker: Worker<C, V, R>,
    contexts: mpsc::Receiver<C>,
    values: mpsc::Receiver<V>,
    output: mpsc::Sender<R>,
}

enum Topology<C, V, R> {
    /// A single worker driven by the result consumer.
    Inline {
        worker: Worker<C, V, R>,
        input_tx: mpsc::Sender<Input<C, V>>,
        input_rx: mpsc::Receiver<Input<C, V>>,
    },

    /// One task per worker between the two distributors and the merge.
    Parallel {
        slots: Vec<WorkerSlot<C, V, R>>,
        broadcast: BroadcastDistributor<C>,
        balance: BalancedDistributor<V>,
        context_tx: mpsc::Sender<C>,
        value_tx: mpsc::Sender<V>,
        outputs: Vec<mpsc::Receiver<R>>,
    },
}

impl<C, V, R> Topology<C, V, R>
where
    C: Clone + Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    fn inline(mut workers: Vec<Worker<C, V, R>>, config: &PipelineConfig) -> Self {
        // Contexts and values share one ordered channel so the worker sees
        // them exactly as they were sent.
        let (input_tx, input_rx) = mpsc::channel(config.input_buffer * 2);
        let worker = workers.remove(0);
        Self::Inline {
            worker,
            input_tx,
            input_rx,
        }
    }

    fn parallel(workers: Vec<Worker<C, V, R>>, config: &PipelineConfig) -> Self {
        let pool_size = workers.len();
        let (context_tx, context_rx) = mpsc::channel(config.input_buffer);
        let (value_tx, value_rx) = mpsc::channel(config.input_buffer);

        let (broadcast, context_lanes) =
            BroadcastDistributor::new(context_rx, pool_size, config.lane_buffer);
        let (balance, value_lanes) =
            BalancedDistributor::new(value_rx, pool_size, config.lane_buffer);

        let mut outputs = Vec::with_capacity(pool_size);
        let slots = workers
            .into_iter()
            .zip(context_lanes)
            .zip(value_lanes)
            .map(|((worker, contexts), values)| {
                let (output, rx) = mpsc::channel(config.lane_buffer);
                outputs.push(rx);
                WorkerSlot {
                    worker,
                    contexts,
                    values,
                    output,
                }
            })
            .collect();

        Self::Parallel {
            slots,
            broadcast,
            balance,
            context_tx,
            value_tx,
            outputs,
        }
    }
}

/// A wired pipeline in the `Building` state.
pub struct Pipeline<C, V, R> {
    config: PipelineConfig,
    control: Arc<Control>,
    topology: Topology<C, V, R>,
}

impl<C, V, R> Pipeline<C, V, R>
where
    C: Clone + Send + Sync + 'static,
    V: Send + 'static,
    R: Send + 'static,
{
    /// Start building a pipeline whose workers come from `factory`.
    pub fn builder(factory: impl ProcessorFactory<C, V, R> + 'static) -> PipelineBuilder<C, V, R> {
        PipelineBuilder::new(factory)
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.control.state()
    }

    /// A handle for observing and controlling the pipeline once started.
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            control: self.control.clone(),
            default_timeout: self.config.quiescence_timeout,
        }
    }

    /// Move to `Running` and return the stream endpoints.
    ///
    /// With more than one worker every lane and both distributors run on
    /// their own Tokio tasks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime while the pool has more than
    /// one worker.
    pub fn start(self) -> RunningPipeline<C, V, R> {
        let handle = self.handle();
        let control = self.control;
        control.mark_running();

        match self.topology {
            Topology::Inline {
                worker,
                input_tx,
                input_rx,
            } => {
                let contexts = ContextSender::inline(input_tx.clone(), control.clone());
                let values = ValueSender::inline(input_tx, control.clone());
                let inner = lane::inline(worker, input_rx, control.clone());

                RunningPipeline {
                    contexts,
                    values,
                    results: ResultStream::new(inner, control),
                    handle,
                }
            }
            Topology::Parallel {
                slots,
                broadcast,
                balance,
                context_tx,
                value_tx,
                outputs,
            } => {
                let shutdown = control.shutdown_token().clone();
                tokio::spawn(broadcast.run(shutdown.clone()));
                tokio::spawn(balance.run(shutdown));

                for slot in slots {
                    Lane::new(slot.worker, slot.contexts, slot.values, control.clone())
                        .spawn(slot.output);
                }

                info!(workers = control.pool_size(), "Worker lanes spawned");

                RunningPipeline {
                    contexts: ContextSender::broadcast(context_tx, control.clone()),
                    values: ValueSender::balance(value_tx, control.clone()),
                    results: ResultStream::new(merge_lanes(outputs), control),
                    handle,
                }
            }
        }
    }
}

/// The endpoints of a running pipeline.
///
/// Closing (dropping) both inputs lets the pipeline drain; the result stream
/// then ends and the pipeline completes.
///
/// Inputs are bounded. A pool of one worker only makes progress while the
/// result stream is polled, and its shared input holds `2 * input_buffer`
/// items, so a caller that sends more than that before reading results
/// waits forever. Larger pools absorb a few sends per worker before the
/// same happens. Send from one task and consume results from another.
pub struct RunningPipeline<C, V, R> {
    /// Context-input endpoint
    pub contexts: ContextSender<C, V>,

    /// Value-input endpoint
    pub values: ValueSender<C, V>,

    /// Result-output endpoint
    pub results: ResultStream<R>,

    /// Lifecycle handle
    pub handle: PipelineHandle,
}

/// Cloneable handle to a pipeline's lifecycle.
#[derive(Clone)]
pub struct PipelineHandle {
    control: Arc<Control>,
    default_timeout: Duration,
}

impl PipelineHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.control.state()
    }

    /// The terminal failure, if the pipeline has failed.
    pub fn failure(&self) -> Option<CpError> {
        self.control.failure()
    }

    /// Number of workers in the pool.
    pub fn pool_size(&self) -> usize {
        self.control.pool_size()
    }

    /// Whether the single worker runs in-line with the result consumer.
    pub fn is_inline(&self) -> bool {
        self.control.is_inline()
    }

    /// Snapshot of the pipeline statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.control.stats.snapshot()
    }

    /// Wait until every worker has absorbed every context sent before this
    /// call, and at least one.
    ///
    /// Fails with [`CpError::Timeout`] if that does not happen within
    /// `timeout`, or with the pipeline's failure if it fails first.
    ///
    /// A pipeline of one worker processes its inputs strictly in send order,
    /// so it is quiescent as soon as one context has been accepted: any
    /// value sent afterwards is queued behind that context. The worker only
    /// absorbs it once the result stream is polled, so [`stats`](Self::stats)
    /// may still report zero absorbed contexts at that point.
    pub async fn await_quiescence(&self, timeout: Duration) -> Result<()> {
        let control = &self.control;
        let pool_size = control.pool_size();
        let baseline = control.stats.contexts_submitted().max(1);

        debug!(baseline, timeout = ?timeout, "Awaiting quiescence");

        control
            .quiescence
            .wait_until(timeout, || {
                let absorbed = if control.is_inline() {
                    if control.stats.contexts_submitted() >= baseline {
                        pool_size
                    } else {
                        0
                    }
                } else {
                    control.stats.lanes_with_contexts(baseline)
                };

                if absorbed >= pool_size {
                    Progress::Reached
                } else if let Some(error) = control.failure() {
                    Progress::Aborted(error)
                } else if control.state() == PipelineState::Completed {
                    Progress::Aborted(CpError::InputClosed("context"))
                } else {
                    Progress::Waiting {
                        absorbed,
                        required: pool_size,
                    }
                }
            })
            .await
    }

    /// [`await_quiescence`](Self::await_quiescence) with the configured
    /// default deadline.
    pub async fn await_default_quiescence(&self) -> Result<()> {
        self.await_quiescence(self.default_timeout).await
    }

    /// Cancel the pipeline. The result stream ends with [`CpError::Cancelled`].
    ///
    /// Returns false if the pipeline had already finished.
    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    /// Wait until the pipeline reaches `Completed` or `Failed`.
    pub async fn wait_terminated(&self) -> PipelineState {
        let mut state = self.control.subscribe();
        let terminal = match state.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.control.state(),
        };
        terminal
    }
}

impl<C, V, R> std::fmt::Debug for Pipeline<C, V, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.control.state())
            .field("pool_size", &self.config.pool_size)
            .field("inline", &self.config.is_inline())
            .finish()
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("state", &self.state())
            .field("pool_size", &self.pool_size())
            .finish()
    }
}
