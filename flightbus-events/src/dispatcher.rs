//! Event dispatcher implementation

use crate::emission::Emission;
use crate::subscriber::{AsyncHandler, DispatchError, Subscriber, SubscriberResult, SyncHandler};
use dashmap::DashMap;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

/// Per-invocation publish/subscribe hub.
///
/// `M` is the message carried by every emission and `R` the value each
/// subscriber returns to [`emit_async`](Self::emit_async). Clones share the
/// same subscriber table, so a subscriber handed a clone emits on the very
/// instance that delivered its message. Two dispatchers built with
/// [`new`](Self::new) never see each other's emissions.
pub struct EventDispatcher<M, R = ()> {
    /// Subscribers for each event name, in subscription order
    subscribers: Arc<DashMap<String, Vec<Subscriber<M, R>>>>,

    /// Configuration
    config: Arc<DispatcherConfig>,
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Trace subscriptions and emissions at debug level
    pub trace_emissions: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            trace_emissions: true,
        }
    }
}

impl<M, R> Clone for EventDispatcher<M, R> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            config: Arc::clone(&self.config),
        }
    }
}

impl<M, R> std::fmt::Debug for EventDispatcher<M, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("events", &self.subscribers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<M, R> EventDispatcher<M, R>
where
    M: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create a fresh, empty dispatcher
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with custom config
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    /// Subscribe a synchronous callback to an event.
    ///
    /// The callback receives the dispatcher that delivered the message and the
    /// message itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightbus_events::EventDispatcher;
    ///
    /// let dispatcher: EventDispatcher<String> = EventDispatcher::new();
    /// dispatcher.subscribe("greet", |_, name: &String| {
    ///     println!("hello {name}");
    ///     Ok(())
    /// });
    /// dispatcher.emit("greet", &"world".to_string()).unwrap();
    /// ```
    pub fn subscribe<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&EventDispatcher<M, R>, &M) -> SubscriberResult<R> + Send + Sync + 'static,
    {
        let handler: Arc<SyncHandler<M, R>> = Arc::new(handler);
        self.push(event.into(), Subscriber::Sync(handler));
    }

    /// Subscribe a callback that returns a pending computation.
    ///
    /// The callback gets an owned clone of the dispatcher and of the message so
    /// the returned future can outlive the emitting call.
    pub fn subscribe_async<F, Fut>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(EventDispatcher<M, R>, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SubscriberResult<R>> + Send + 'static,
    {
        let handler: Arc<AsyncHandler<M, R>> =
            Arc::new(move |dispatcher: EventDispatcher<M, R>, message: M| {
                handler(dispatcher, message).boxed()
            });
        self.push(event.into(), Subscriber::Async(handler));
    }

    fn push(&self, event: String, subscriber: Subscriber<M, R>) {
        if self.config.trace_emissions {
            debug!(event = %event, kind = subscriber.kind(), "Subscribed handler");
        }

        self.subscribers.entry(event).or_default().push(subscriber);
    }

    /// Copy the subscriber sequence so no map guard is held while callbacks run.
    fn snapshot(&self, event: &str) -> Vec<Subscriber<M, R>> {
        self.subscribers
            .get(event)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default()
    }

    /// Emit an event synchronously.
    ///
    /// Subscribers are invoked in subscription order. The first synchronous
    /// subscriber that fails stops the emission and its error is returned;
    /// later subscribers are not invoked. Async subscribers are started detached
    /// on the current runtime and their failures are only logged.
    pub fn emit(&self, event: &str, message: &M) -> Result<(), DispatchError> {
        let subscribers = self.snapshot(event);

        if self.config.trace_emissions {
            debug!(event, subscribers = subscribers.len(), "Emitting event");
        }

        for (index, subscriber) in subscribers.into_iter().enumerate() {
            match subscriber {
                Subscriber::Sync(handler) => {
                    handler(self, message).map_err(|source| DispatchError::Subscriber {
                        event: event.to_string(),
                        index,
                        source,
                    })?;
                }
                Subscriber::Async(handler) => {
                    let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime {
                        event: event.to_string(),
                    })?;
                    let pending = handler(self.clone(), message.clone());
                    let event = event.to_string();

                    runtime.spawn(async move {
                        if let Err(e) = pending.await {
                            error!(event = %event, index, error = %e, "Detached subscriber failed");
                        }
                    });
                }
            }
        }

        Ok(())
    }

    /// Emit an event to every subscriber and aggregate their completion.
    ///
    /// The subscriber sequence is snapshotted now; later subscriptions do not
    /// take part. Every subscriber is posted to the back of the runtime task
    /// queue behind a start gate that opens when the returned [`Emission`] is
    /// first polled or dropped, so none of them runs before this call returns.
    /// Once started, subscribers always run to completion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightbus_events::EventDispatcher;
    ///
    /// # tokio_test::block_on(async {
    /// let dispatcher: EventDispatcher<u32, u32> = EventDispatcher::new();
    /// dispatcher.subscribe("double", |_, n: &u32| Ok(n * 2));
    /// dispatcher.subscribe_async("double", |_, n: u32| async move { Ok(n * 4) });
    ///
    /// let results = dispatcher.emit_async("double", 5).await.unwrap();
    /// assert_eq!(results, vec![10, 20]);
    /// # });
    /// ```
    pub fn emit_async(&self, event: &str, message: M) -> Emission<R> {
        let subscribers = self.snapshot(event);

        if self.config.trace_emissions {
            debug!(event, subscribers = subscribers.len(), "Emitting event (async)");
        }

        if subscribers.is_empty() {
            return Emission::ready(Ok(Vec::new()));
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                return Emission::ready(Err(DispatchError::NoRuntime {
                    event: event.to_string(),
                }));
            }
        };

        let (gate, _) = watch::channel(());

        let tasks = subscribers
            .into_iter()
            .map(|subscriber| {
                let mut opened = gate.subscribe();
                let dispatcher = self.clone();
                let message = message.clone();

                runtime.spawn(async move {
                    // Resolves with an error once the gate sender is gone.
                    let _ = opened.changed().await;

                    match subscriber {
                        Subscriber::Sync(handler) => handler(&dispatcher, &message),
                        Subscriber::Async(handler) => handler(dispatcher, message).await,
                    }
                })
            })
            .collect();

        Emission::joining(event.to_string(), gate, tasks)
    }

    /// Get the number of subscribers for an event
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map(|s| s.len()).unwrap_or(0)
    }

    /// Whether an event has at least one subscriber
    pub fn has_subscribers(&self, event: &str) -> bool {
        self.subscriber_count(event) > 0
    }

    /// Drop every subscription on this dispatcher and its clones.
    ///
    /// Callbacks that captured a clone of the dispatcher keep its table alive
    /// until they are removed; handlers clear the dispatcher when the
    /// invocation ends.
    pub fn clear(&self) {
        self.subscribers.clear();
    }
}

impl<M, R> Default for EventDispatcher<M, R>
where
    M: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatcher builder
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create new dispatcher builder
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
        }
    }

    /// Enable/disable emission tracing
    pub fn trace_emissions(mut self, enabled: bool) -> Self {
        self.config.trace_emissions = enabled;
        self
    }

    /// Build the dispatcher
    pub fn build<M, R>(self) -> EventDispatcher<M, R>
    where
        M: Clone + Send + Sync + 'static,
        R: Send + 'static,
    {
        EventDispatcher::with_config(self.config)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
