//! Context and value input endpoints.

use crate::control::Control;
use cp_error::{CpError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// One item on the shared input of an in-line pipeline.
#[derive(Debug)]
pub(crate) enum Input<C, V> {
    Context(C),
    Value(V),
}

enum ContextRoute<C, V> {
    Broadcast(mpsc::Sender<C>),
    Inline(mpsc::Sender<Input<C, V>>),
}

enum ValueRoute<C, V> {
    Balance(mpsc::Sender<V>),
    Inline(mpsc::Sender<Input<C, V>>),
}

/// Context-input endpoint.
///
/// Every context sent here is offered to every worker, in send order. The
/// endpoint closes once every clone has been dropped or closed.
pub struct ContextSender<C, V> {
    route: ContextRoute<C, V>,
    control: Arc<Control>,
}

impl<C, V> ContextSender<C, V>
where
    C: Send + 'static,
    V: Send + 'static,
{
    pub(crate) fn broadcast(tx: mpsc::Sender<C>, control: Arc<Control>) -> Self {
        Self {
            route: ContextRoute::Broadcast(tx),
            control,
        }
    }

    pub(crate) fn inline(tx: mpsc::Sender<Input<C, V>>, control: Arc<Control>) -> Self {
        Self {
            route: ContextRoute::Inline(tx),
            control,
        }
    }

    /// Send a context, waiting for room on the endpoint.
    ///
    /// Room only frees up while results are consumed; see
    /// [`RunningPipeline`](crate::RunningPipeline).
    ///
    /// Fails with [`CpError::InputClosed`] once the pipeline has stopped.
    pub async fn send(&self, context: C) -> Result<()> {
        let shutdown = self.control.shutdown_token();
        let sent = tokio::select! {
            _ = shutdown.cancelled() => false,
            sent = async {
                match &self.route {
                    ContextRoute::Broadcast(tx) => tx.send(context).await.is_ok(),
                    ContextRoute::Inline(tx) => tx.send(Input::Context(context)).await.is_ok(),
                }
            } => sent,
        };

        if !sent {
            return Err(CpError::InputClosed("context"));
        }
        self.control.record_context_submitted();
        trace!("Context submitted");
        Ok(())
    }

    /// Close this handle. The endpoint closes when the last clone is gone.
    pub fn close(self) {
        debug!("Context input handle closed");
    }
}

impl<C, V> Clone for ContextSender<C, V> {
    fn clone(&self) -> Self {
        let route = match &self.route {
            ContextRoute::Broadcast(tx) => ContextRoute::Broadcast(tx.clone()),
            ContextRoute::Inline(tx) => ContextRoute::Inline(tx.clone()),
        };
        Self {
            route,
            control: self.control.clone(),
        }
    }
}

/// Value-input endpoint.
///
/// Every value sent here is delivered to exactly one worker.
pub struct ValueSender<C, V> {
    route: ValueRoute<C, V>,
    control: Arc<Control>,
}

impl<C, V> ValueSender<C, V>
where
    C: Send + 'static,
    V: Send + 'static,
{
    pub(crate) fn balance(tx: mpsc::Sender<V>, control: Arc<Control>) -> Self {
        Self {
            route: ValueRoute::Balance(tx),
            control,
        }
    }

    pub(crate) fn inline(tx: mpsc::Sender<Input<C, V>>, control: Arc<Control>) -> Self {
        Self {
            route: ValueRoute::Inline(tx),
            control,
        }
    }

    /// Send a value, waiting for room on the endpoint.
    ///
    /// Room only frees up while results are consumed; see
    /// [`RunningPipeline`](crate::RunningPipeline).
    ///
    /// Fails with [`CpError::InputClosed`] once the pipeline has stopped.
    pub async fn send(&self, value: V) -> Result<()> {
        let shutdown = self.control.shutdown_token();
        let sent = tokio::select! {
            _ = shutdown.cancelled() => false,
            sent = async {
                match &self.route {
                    ValueRoute::Balance(tx) => tx.send(value).await.is_ok(),
                    ValueRoute::Inline(tx) => tx.send(Input::Value(value)).await.is_ok(),
                }
            } => sent,
        };

        if !sent {
            return Err(CpError::InputClosed("value"));
        }
        self.control.stats.record_value_submitted();
        trace!("Value submitted");
        Ok(())
    }

    /// Close this handle. The endpoint closes when the last clone is gone.
    pub fn close(self) {
        debug!("Value input handle closed");
    }
}

impl<C, V> Clone for ValueSender<C, V> {
    fn clone(&self) -> Self {
        let route = match &self.route {
            ValueRoute::Balance(tx) => ValueRoute::Balance(tx.clone()),
            ValueRoute::Inline(tx) => ValueRoute::Inline(tx.clone()),
        };
        Self {
            route,
            control: self.control.clone(),
        }
    }
}

impl<C, V> std::fmt::Debug for ContextSender<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSender")
            .field("inline", &matches!(self.route, ContextRoute::Inline(_)))
            .finish()
    }
}

impl<C, V> std::fmt::Debug for ValueSender<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueSender")
            .field("inline", &matches!(self.route, ValueRoute::Inline(_)))
            .finish()
    }
}
