//! Pipeline lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single pipeline instance.
///
/// Transitions are one-way: `Building -> Running -> {Completed | Failed}`.
/// A failed pipeline is never restarted; the caller builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Topology is wired but no data flows yet
    Building,

    /// Lanes are executing
    Running,

    /// Both inputs closed and all in-flight work drained without a fault
    Completed,

    /// A worker faulted or the pipeline was cancelled
    Failed,
}

impl PipelineState {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Building, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "Building"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
