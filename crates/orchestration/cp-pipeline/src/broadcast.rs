//! Broadcast distributor: one copy of every context to every lane.

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Fans the context input out to one lane per worker.
///
/// A context is offered to every open lane before the next one is pulled
/// from the input, so each lane sees contexts in input order. A full lane
/// holds the broadcast back; contexts then queue here rather than at the
/// worker.
pub(crate) struct BroadcastDistributor<C> {
    input: mpsc::Receiver<C>,
    lanes: Vec<Option<mpsc::Sender<C>>>,
}

impl<C> BroadcastDistributor<C>
where
    C: Clone + Send + 'static,
{
    /// Create a distributor over `num_lanes` lanes of `buffer_size` slots each.
    pub(crate) fn new(
        input: mpsc::Receiver<C>,
        num_lanes: usize,
        buffer_size: usize,
    ) -> (Self, Vec<mpsc::Receiver<C>>) {
        let mut senders = Vec::with_capacity(num_lanes);
        let mut receivers = Vec::with_capacity(num_lanes);

        for _ in 0..num_lanes {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.push(Some(tx));
            receivers.push(rx);
        }

        let distributor = Self {
            input,
            lanes: senders,
        };

        (distributor, receivers)
    }

    /// Number of lanes still accepting contexts.
    pub(crate) fn open_lanes(&self) -> usize {
        self.lanes.iter().filter(|lane| lane.is_some()).count()
    }

    /// Deliver one context to every open lane.
    ///
    /// Lanes whose worker has gone away are dropped from the broadcast.
    pub(crate) async fn broadcast(&mut self, context: C) {
        let sends = self.lanes.iter().enumerate().map(|(lane, sender)| {
            let context = context.clone();
            async move {
                match sender {
                    Some(tx) => (lane, tx.send(context).await.is_ok()),
                    None => (lane, true),
                }
            }
        });

        let results = join_all(sends).await;
        for (lane, delivered) in results {
            if !delivered {
                debug!(lane, "Context lane closed, removing from broadcast");
                self.lanes[lane] = None;
            }
        }
    }

    /// Run until the input closes, every lane closes, or `shutdown` fires.
    ///
    /// Returning drops every lane sender, which tells each worker that no
    /// further contexts will arrive.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        debug!(lanes = self.lanes.len(), "Broadcast distributor started");

        loop {
            let context = tokio::select! {
                _ = shutdown.cancelled() => break,
                context = self.input.recv() => match context {
                    Some(context) => context,
                    None => break,
                },
            };

            trace!("Broadcasting context");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.broadcast(context) => {}
            }

            if self.open_lanes() == 0 {
                debug!("All context lanes closed");
                break;
            }
        }

        debug!("Broadcast distributor stopped");
    }
}
