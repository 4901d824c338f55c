//! Explicit quiescence tracking.
//!
//! Lanes signal the monitor every time a worker absorbs a context and the
//! controller signals it on every lifecycle change. A waiter re-evaluates its
//! condition on each signal until it holds, the pipeline can no longer reach
//! it, or the deadline passes.

use cp_error::{CpError, Result};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::debug;

/// Outcome of one evaluation of a quiescence condition.
#[derive(Debug)]
pub(crate) enum Progress {
    /// The condition holds
    Reached,

    /// `absorbed` of `required` workers satisfy the condition
    Waiting { absorbed: usize, required: usize },

    /// The condition can never hold
    Aborted(CpError),
}

#[derive(Debug, Default)]
pub(crate) struct QuiescenceMonitor {
    notify: Notify,
}

impl QuiescenceMonitor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wake every waiter so it re-evaluates its condition.
    pub(crate) fn signal(&self) {
        self.notify.notify_waiters();
    }

    /// Wait until `check` reports [`Progress::Reached`] or `timeout` elapses.
    pub(crate) async fn wait_until<F>(&self, timeout: Duration, mut check: F) -> Result<()>
    where
        F: FnMut() -> Progress,
    {
        let start = Instant::now();
        let mut last = (0, 0);

        let wait = async {
            loop {
                // Register interest before checking so a signal between the
                // check and the await is not lost.
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                match check() {
                    Progress::Reached => return Ok(()),
                    Progress::Aborted(error) => return Err(error),
                    Progress::Waiting { absorbed, required } => {
                        debug!(absorbed, required, "Waiting for quiescence");
                        last = (absorbed, required);
                    }
                }

                notified.await;
            }
        };

        let outcome = tokio::time::timeout(timeout, wait).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(CpError::Timeout {
                waited: start.elapsed(),
                absorbed: last.0,
                required: last.1,
            }),
        }
    }
}
