//! Statistics for pipeline runs.

use chrono::{DateTime, Duration, Utc};
use cp_types::WorkerId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-lane counters.
///
/// Each lane is updated by its own task only. The alignment keeps every lane
/// on its own cache line so lanes stored side by side in a `Vec` do not
/// contend with each other.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct LaneStats {
    worker: WorkerId,

    /// Contexts this worker has absorbed
    contexts_absorbed: AtomicU64,

    /// Values transformed successfully
    values_processed: AtomicU64,

    /// Values whose transform failed
    values_failed: AtomicU64,
}

impl LaneStats {
    /// Create new lane statistics for the given worker.
    pub fn new(worker: WorkerId) -> Self {
        Self {
            worker,
            ..Default::default()
        }
    }

    /// The worker this lane belongs to.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Record an absorbed context.
    pub fn record_context(&self) {
        self.contexts_absorbed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a successfully transformed value.
    pub fn record_value(&self) {
        self.values_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed transform.
    pub fn record_failure(&self) {
        self.values_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of contexts absorbed.
    pub fn contexts_absorbed(&self) -> u64 {
        self.contexts_absorbed.load(Ordering::SeqCst)
    }

    /// Get the number of values processed.
    pub fn values_processed(&self) -> u64 {
        self.values_processed.load(Ordering::Relaxed)
    }

    /// Get the number of values failed.
    pub fn values_failed(&self) -> u64 {
        self.values_failed.load(Ordering::Relaxed)
    }

    /// Create a snapshot of the current lane statistics.
    pub fn snapshot(&self) -> LaneStatsSnapshot {
        LaneStatsSnapshot {
            worker: self.worker,
            contexts_absorbed: self.contexts_absorbed(),
            values_processed: self.values_processed(),
            values_failed: self.values_failed(),
        }
    }
}

/// Statistics collected during a pipeline run.
#[derive(Debug)]
pub struct PipelineStats {
    /// When the pipeline started running
    started_at: Mutex<Option<DateTime<Utc>>>,

    /// When the pipeline reached a terminal state
    completed_at: Mutex<Option<DateTime<Utc>>>,

    /// Contexts accepted by the context input
    contexts_submitted: AtomicU64,

    /// Values accepted by the value input
    values_submitted: AtomicU64,

    lanes: Vec<LaneStats>,
}

impl PipelineStats {
    /// Create statistics for a pool of `pool_size` workers.
    pub fn new(pool_size: usize) -> Self {
        Self {
            started_at: Mutex::new(None),
            completed_at: Mutex::new(None),
            contexts_submitted: AtomicU64::new(0),
            values_submitted: AtomicU64::new(0),
            lanes: (0..pool_size).map(LaneStats::new).collect(),
        }
    }

    /// Mark the pipeline as started.
    pub fn mark_started(&self) {
        *self.started_at.lock() = Some(Utc::now());
    }

    /// Mark the pipeline as finished. Only the first call has an effect.
    pub fn mark_completed(&self) {
        let mut completed = self.completed_at.lock();
        if completed.is_none() {
            *completed = Some(Utc::now());
        }
    }

    /// Record a context accepted by the context input.
    pub fn record_context_submitted(&self) {
        self.contexts_submitted.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a value accepted by the value input.
    pub fn record_value_submitted(&self) {
        self.values_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of contexts submitted.
    pub fn contexts_submitted(&self) -> u64 {
        self.contexts_submitted.load(Ordering::SeqCst)
    }

    /// Get the number of values submitted.
    pub fn values_submitted(&self) -> u64 {
        self.values_submitted.load(Ordering::Relaxed)
    }

    /// Statistics for one lane.
    ///
    /// # Panics
    ///
    /// Panics if `worker` is not a slot of this pool.
    pub fn lane(&self, worker: WorkerId) -> &LaneStats {
        &self.lanes[worker]
    }

    /// Statistics for every lane, in worker order.
    pub fn lanes(&self) -> &[LaneStats] {
        &self.lanes
    }

    /// Number of workers that have absorbed at least `target` contexts.
    pub fn lanes_with_contexts(&self, target: u64) -> usize {
        self.lanes
            .iter()
            .filter(|lane| lane.contexts_absorbed() >= target)
            .count()
    }

    /// Total values processed across all lanes.
    pub fn values_processed(&self) -> u64 {
        self.lanes.iter().map(LaneStats::values_processed).sum()
    }

    /// Total values failed across all lanes.
    pub fn values_failed(&self) -> u64 {
        self.lanes.iter().map(LaneStats::values_failed).sum()
    }

    /// Get the duration of the run so far, or of the whole run once finished.
    pub fn duration(&self) -> Option<Duration> {
        let started = *self.started_at.lock();
        let completed = *self.completed_at.lock();
        match (started, completed) {
            (Some(start), Some(end)) => Some(end - start),
            (Some(start), None) => Some(Utc::now() - start),
            _ => None,
        }
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: *self.started_at.lock(),
            completed_at: *self.completed_at.lock(),
            contexts_submitted: self.contexts_submitted(),
            values_submitted: self.values_submitted(),
            values_processed: self.values_processed(),
            values_failed: self.values_failed(),
            lanes: self.lanes.iter().map(LaneStats::snapshot).collect(),
        }
    }
}

/// A serializable snapshot of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneStatsSnapshot {
    pub worker: WorkerId,
    pub contexts_absorbed: u64,
    pub values_processed: u64,
    pub values_failed: u64,
}

/// A serializable snapshot of pipeline statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub contexts_submitted: u64,
    pub values_submitted: u64,
    pub values_processed: u64,
    pub values_failed: u64,
    pub lanes: Vec<LaneStatsSnapshot>,
}

impl StatsSnapshot {
    /// Get the duration of the run, if it has finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Values processed per second over the whole run.
    pub fn values_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            let secs = d.num_milliseconds() as f64 / 1000.0;
            if secs > 0.0 {
                self.values_processed as f64 / secs
            } else {
                0.0
            }
        })
    }

    /// Number of lanes that transformed at least one value.
    pub fn active_lanes(&self) -> usize {
        self.lanes
            .iter()
            .filter(|lane| lane.values_processed > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_stats_new() {
        let stats = LaneStats::new(5);
        assert_eq!(stats.worker(), 5);
        assert_eq!(stats.contexts_absorbed(), 0);
        assert_eq!(stats.values_processed(), 0);
    }

    #[test]
    fn test_lane_stats_alignment() {
        assert_eq!(std::mem::align_of::<LaneStats>(), 64);
    }

    #[test]
    fn test_pipeline_stats_aggregates_lanes() {
        let stats = PipelineStats::new(3);
        stats.lane(0).record_value();
        stats.lane(1).record_value();
        stats.lane(1).record_value();
        stats.lane(2).record_failure();

        assert_eq!(stats.values_processed(), 3);
        assert_eq!(stats.values_failed(), 1);
        assert_eq!(stats.lanes().len(), 3);
    }

    #[test]
    fn test_lanes_with_contexts() {
        let stats = PipelineStats::new(3);
        assert_eq!(stats.lanes_with_contexts(1), 0);
        assert_eq!(stats.lanes_with_contexts(0), 3);

        stats.lane(0).record_context();
        stats.lane(2).record_context();
        stats.lane(2).record_context();

        assert_eq!(stats.lanes_with_contexts(1), 2);
        assert_eq!(stats.lanes_with_contexts(2), 1);
    }

    #[test]
    fn test_duration_lifecycle() {
        let stats = PipelineStats::new(1);
        assert!(stats.duration().is_none());

        stats.mark_started();
        assert!(stats.duration().is_some());
        assert!(stats.snapshot().duration().is_none());

        stats.mark_completed();
        let first = stats.snapshot().completed_at;
        stats.mark_completed();
        assert_eq!(stats.snapshot().completed_at, first);
        assert!(stats.snapshot().duration().is_some());
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = PipelineStats::new(2);
        stats.record_context_submitted();
        stats.record_value_submitted();
        stats.lane(1).record_context();
        stats.lane(1).record_value();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.contexts_submitted, 1);
        assert_eq!(snapshot.values_submitted, 1);
        assert_eq!(snapshot.active_lanes(), 1);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StatsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lanes, snapshot.lanes);
    }
}
