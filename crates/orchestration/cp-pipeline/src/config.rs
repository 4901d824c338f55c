//! Configuration types for the pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of every lane: the single-slot discipline.
pub const DEFAULT_LANE_BUFFER: usize = 1;

/// Default deadline for [`await_default_quiescence`](crate::PipelineHandle::await_default_quiescence).
pub const DEFAULT_QUIESCENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of workers in the pool
    pub pool_size: usize,

    /// Capacity of each per-worker lane (context, value and output)
    pub lane_buffer: usize,

    /// Capacity of each input endpoint
    pub input_buffer: usize,

    /// Deadline used when the caller does not supply one
    #[serde(with = "duration_secs")]
    pub quiescence_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus(),
            lane_buffer: DEFAULT_LANE_BUFFER,
            input_buffer: DEFAULT_LANE_BUFFER,
            quiescence_timeout: DEFAULT_QUIESCENCE_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the per-lane buffer size.
    pub fn with_lane_buffer(mut self, size: usize) -> Self {
        self.lane_buffer = size;
        self
    }

    /// Set the input endpoint buffer size.
    pub fn with_input_buffer(mut self, size: usize) -> Self {
        self.input_buffer = size;
        self
    }

    /// Set the default quiescence deadline.
    pub fn with_quiescence_timeout(mut self, timeout: Duration) -> Self {
        self.quiescence_timeout = timeout;
        self
    }

    /// Whether the single worker runs in-line with the result consumer.
    ///
    /// A pool of one has no asynchronous boundary, so context absorption and
    /// value transformation happen strictly in arrival order.
    pub fn is_inline(&self) -> bool {
        self.pool_size == 1
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be at least 1".to_string());
        }
        if self.lane_buffer == 0 {
            return Err("lane_buffer must be at least 1".to_string());
        }
        if self.input_buffer == 0 {
            return Err("input_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Get the number of available CPUs.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Serde helper for Duration serialization as whole seconds.
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
