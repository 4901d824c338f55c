//! Balanced distributor: each value to exactly one worker lane.

use futures::future::select_all;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Distributes values across worker lanes on demand.
///
/// A lane with a free slot is a lane whose worker is asking for input. The
/// distributor routes to the first such lane at or after its round-robin
/// cursor; when every lane is full it waits for whichever frees up first.
pub(crate) struct BalancedDistributor<V> {
    input: mpsc::Receiver<V>,

    /// Senders for each worker lane
    lanes: Vec<mpsc::Sender<V>>,

    /// Round-robin cursor used to break ties between idle lanes
    next_lane: usize,
}

impl<V> BalancedDistributor<V>
where
    V: Send + 'static,
{
    /// Create a distributor over `num_lanes` lanes of `buffer_size` slots each.
    pub(crate) fn new(
        input: mpsc::Receiver<V>,
        num_lanes: usize,
        buffer_size: usize,
    ) -> (Self, Vec<mpsc::Receiver<V>>) {
        let mut senders = Vec::with_capacity(num_lanes);
        let mut receivers = Vec::with_capacity(num_lanes);

        for _ in 0..num_lanes {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.push(tx);
            receivers.push(rx);
        }

        let distributor = Self {
            input,
            lanes: senders,
            next_lane: 0,
        };

        (distributor, receivers)
    }

    /// Get the number of lanes.
    pub(crate) fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Route a value to one lane.
    ///
    /// Returns the chosen lane, or gives the value back if every lane is closed.
    pub(crate) async fn route(&mut self, value: V) -> Result<usize, V> {
        let num_lanes = self.lanes.len();

        // Idle lanes first, starting at the cursor.
        for offset in 0..num_lanes {
            let lane = (self.next_lane + offset) % num_lanes;
            match self.lanes[lane].try_reserve() {
                Ok(permit) => {
                    permit.send(value);
                    self.next_lane = (lane + 1) % num_lanes;
                    trace!(lane, "Routed value to idle lane");
                    return Ok(lane);
                }
                Err(TrySendError::Full(())) | Err(TrySendError::Closed(())) => continue,
            }
        }

        // Every lane is busy: take the first one that frees a slot.
        let lanes = &self.lanes;
        let mut pending: Vec<_> = lanes
            .iter()
            .enumerate()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(lane, tx)| Box::pin(async move { (lane, tx.reserve().await) }))
            .collect();

        while !pending.is_empty() {
            let ((lane, reserved), _, rest) = select_all(pending).await;
            match reserved {
                Ok(permit) => {
                    permit.send(value);
                    self.next_lane = (lane + 1) % num_lanes;
                    trace!(lane, "Routed value to first lane with demand");
                    return Ok(lane);
                }
                Err(_) => pending = rest,
            }
        }

        Err(value)
    }

    /// Run until the input closes, every lane closes, or `shutdown` fires.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        debug!(lanes = self.num_lanes(), "Balanced distributor started");

        loop {
            let value = tokio::select! {
                _ = shutdown.cancelled() => break,
                value = self.input.recv() => match value {
                    Some(value) => value,
                    None => break,
                },
            };

            let routed = tokio::select! {
                _ = shutdown.cancelled() => break,
                routed = self.route(value) => routed,
            };

            if routed.is_err() {
                debug!("All value lanes closed, dropping value");
                break;
            }
        }

        debug!("Balanced distributor stopped");
    }
}
