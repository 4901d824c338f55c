//! Per-worker context state.

/// Context state held by one worker.
///
/// A worker starts in `NoContext` and moves to `Ready` on its first absorbed
/// context. Every later context replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkerState<C> {
    /// No context absorbed yet
    #[default]
    NoContext,

    /// Holds the most recently absorbed context
    Ready(C),
}

impl<C> WorkerState<C> {
    /// Replace the current context, returning the previous one if any.
    pub fn absorb(&mut self, context: C) -> Option<C> {
        match std::mem::replace(self, Self::Ready(context)) {
            Self::NoContext => None,
            Self::Ready(previous) => Some(previous),
        }
    }

    /// The current context, if one has been absorbed.
    pub fn context(&self) -> Option<&C> {
        match self {
            Self::NoContext => None,
            Self::Ready(context) => Some(context),
        }
    }

    /// Returns true once a context has been absorbed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
