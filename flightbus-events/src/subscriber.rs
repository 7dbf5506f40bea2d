//! Subscriber callbacks and dispatch errors

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::dispatcher::EventDispatcher;

/// Boxed error returned by a failing subscriber.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Value a subscriber hands back to the dispatcher.
pub type SubscriberResult<R> = Result<R, BoxError>;

pub(crate) type SyncHandler<M, R> =
    dyn Fn(&EventDispatcher<M, R>, &M) -> SubscriberResult<R> + Send + Sync;

pub(crate) type AsyncHandler<M, R> =
    dyn Fn(EventDispatcher<M, R>, M) -> BoxFuture<'static, SubscriberResult<R>> + Send + Sync;

/// A callback registered for one event name.
///
/// Subscribers have no identity beyond their position in the per-event
/// sequence. Registering the same callback twice yields two invocations.
pub(crate) enum Subscriber<M, R> {
    /// Runs to completion inside the emitting call.
    Sync(Arc<SyncHandler<M, R>>),
    /// Returns a pending computation.
    Async(Arc<AsyncHandler<M, R>>),
}

impl<M, R> Clone for Subscriber<M, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(handler) => Self::Sync(Arc::clone(handler)),
            Self::Async(handler) => Self::Async(Arc::clone(handler)),
        }
    }
}

impl<M, R> Subscriber<M, R> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Async(_) => "async",
        }
    }
}

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A subscriber returned an error.
    #[error("subscriber #{index} for '{event}' failed: {source}")]
    Subscriber {
        event: String,
        index: usize,
        #[source]
        source: BoxError,
    },

    /// A subscriber panicked while running on the task queue.
    #[error("subscriber #{index} for '{event}' panicked: {message}")]
    Panicked {
        event: String,
        index: usize,
        message: String,
    },

    /// An async subscriber was due but no Tokio runtime is running.
    #[error("no async runtime available to run subscribers for '{event}'")]
    NoRuntime { event: String },
}

impl DispatchError {
    /// Name of the event whose emission failed.
    pub fn event(&self) -> &str {
        match self {
            Self::Subscriber { event, .. }
            | Self::Panicked { event, .. }
            | Self::NoRuntime { event } => event,
        }
    }

    /// Position of the failing subscriber, if a subscriber failed.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Subscriber { index, .. } | Self::Panicked { index, .. } => Some(*index),
            Self::NoRuntime { .. } => None,
        }
    }
}
