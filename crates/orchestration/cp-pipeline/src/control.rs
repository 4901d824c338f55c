//! Shared lifecycle state for one running pipeline.

use crate::quiescence::QuiescenceMonitor;
use crate::stats::PipelineStats;
use cp_error::CpError;
use cp_types::{PipelineState, WorkerId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// State shared by the controller, every lane task, the input endpoints and
/// the result stream.
///
/// The first recorded failure wins; later faults from other lanes are
/// dropped so the result stream surfaces exactly one error.
#[derive(Debug)]
pub(crate) struct Control {
    pool_size: usize,
    inline: bool,
    state: watch::Sender<PipelineState>,
    failure: Mutex<Option<CpError>>,
    shutdown: CancellationToken,
    pub(crate) quiescence: QuiescenceMonitor,
    pub(crate) stats: PipelineStats,
}

impl Control {
    pub(crate) fn new(pool_size: usize, inline: bool) -> Self {
        let (state, _) = watch::channel(PipelineState::Building);
        Self {
            pool_size,
            inline,
            state,
            failure: Mutex::new(None),
            shutdown: CancellationToken::new(),
            quiescence: QuiescenceMonitor::new(),
            stats: PipelineStats::new(pool_size),
        }
    }

    pub(crate) fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub(crate) fn is_inline(&self) -> bool {
        self.inline
    }

    pub(crate) fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn failure(&self) -> Option<CpError> {
        self.failure.lock().clone()
    }

    fn transition(&self, next: PipelineState) -> bool {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Building -> Running, then straight on to Failed if the pipeline was
    /// cancelled before it started.
    pub(crate) fn mark_running(&self) {
        let failure = self.failure.lock();
        if self.transition(PipelineState::Running) {
            self.stats.mark_started();
            info!(
                pool_size = self.pool_size,
                inline = self.inline,
                "Pipeline running"
            );
            if failure.is_some() {
                self.transition(PipelineState::Failed);
                self.stats.mark_completed();
            }
        }
    }

    /// Running -> Completed, unless a failure got there first.
    pub(crate) fn mark_completed(&self) {
        let failure = self.failure.lock();
        if failure.is_some() {
            return;
        }
        if self.transition(PipelineState::Completed) {
            self.stats.mark_completed();
            self.quiescence.signal();
            info!(
                values = self.stats.values_processed(),
                contexts = self.stats.contexts_submitted(),
                "Pipeline completed"
            );
        }
    }

    /// Records `error` as the terminal failure and cancels every lane.
    ///
    /// Returns false if the pipeline had already failed or finished.
    pub(crate) fn fail(&self, error: CpError) -> bool {
        let failed = {
            let mut failure = self.failure.lock();
            if failure.is_some() || self.state().is_terminal() {
                return false;
            }
            match &error {
                CpError::Cancelled => info!("Pipeline cancelled"),
                error => error!(error = %error, worker = ?error.worker(), "Pipeline failed"),
            }
            *failure = Some(error);
            self.transition(PipelineState::Failed)
        };
        if failed {
            self.stats.mark_completed();
        }
        self.shutdown.cancel();
        self.quiescence.signal();
        true
    }

    /// Stops the pipeline on behalf of its owner.
    pub(crate) fn cancel(&self) -> bool {
        self.fail(CpError::Cancelled)
    }

    pub(crate) fn record_absorbed(&self, worker: WorkerId) {
        self.stats.lane(worker).record_context();
        self.quiescence.signal();
    }

    pub(crate) fn record_context_submitted(&self) {
        self.stats.record_context_submitted();
        self.quiescence.signal();
    }
}
