//! Aggregated result of an async emission

use crate::subscriber::{DispatchError, SubscriberResult};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Future returned by [`EventDispatcher::emit_async`](crate::EventDispatcher::emit_async).
///
/// Resolves once every snapshotted subscriber has finished, with their return
/// values in subscription order. Fails with the error of the first failing
/// subscriber in subscription order, after all of them have completed.
///
/// Polling opens the start gate. Dropping the emission opens it too, so
/// subscribers still run when nobody awaits the result.
pub struct Emission<R> {
    gate: Option<watch::Sender<()>>,
    outcome: BoxFuture<'static, Result<Vec<R>, DispatchError>>,
}

impl<R: Send + 'static> Emission<R> {
    pub(crate) fn ready(result: Result<Vec<R>, DispatchError>) -> Self {
        Self {
            gate: None,
            outcome: future::ready(result).boxed(),
        }
    }

    pub(crate) fn joining(
        event: String,
        gate: watch::Sender<()>,
        tasks: Vec<JoinHandle<SubscriberResult<R>>>,
    ) -> Self {
        let outcome = async move {
            let finished = future::join_all(tasks).await;
            let mut values = Vec::with_capacity(finished.len());
            let mut failure = None;

            for (index, result) in finished.into_iter().enumerate() {
                let error = match result {
                    Ok(Ok(value)) => {
                        values.push(value);
                        continue;
                    }
                    Ok(Err(source)) => DispatchError::Subscriber {
                        event: event.clone(),
                        index,
                        source,
                    },
                    Err(join_error) => DispatchError::Panicked {
                        event: event.clone(),
                        index,
                        message: join_error.to_string(),
                    },
                };

                if failure.is_none() {
                    failure = Some(error);
                } else {
                    debug!(event = %event, index, error = %error, "Discarding later subscriber failure");
                }
            }

            match failure {
                Some(error) => Err(error),
                None => Ok(values),
            }
        }
        .boxed();

        Self {
            gate: Some(gate),
            outcome,
        }
    }
}

impl<R> Emission<R> {
    /// Let the subscribers start without waiting for their results.
    pub fn open(&mut self) {
        self.gate.take();
    }
}

impl<R> Future for Emission<R> {
    type Output = Result<Vec<R>, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.gate.take();
        this.outcome.poll_unpin(cx)
    }
}

impl<R> std::fmt::Debug for Emission<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emission")
            .field("started", &self.gate.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::EventDispatcher;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_when_all_subscribers_complete() {
        let dispatcher: EventDispatcher<String, u32> = EventDispatcher::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c = calls.clone();
        dispatcher.subscribe("data", move |_, x: &String| {
            c.lock().unwrap().push(format!("sync:{x}"));
            Ok(1)
        });
        let c = calls.clone();
        dispatcher.subscribe_async("data", move |_, x: String| {
            let c = c.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                c.lock().unwrap().push(format!("async:{x}"));
                Ok(2)
            }
        });

        let results = dispatcher.emit_async("data", "hello".to_string()).await.unwrap();

        assert_eq!(results, vec![1, 2]);
        assert_eq!(*calls.lock().unwrap(), vec!["sync:hello", "async:hello"]);
    }

    #[tokio::test]
    async fn test_results_follow_subscription_order() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();

        dispatcher.subscribe_async("race", |_, _| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        });
        dispatcher.subscribe_async("race", |_, _| async { Ok(2) });
        dispatcher.subscribe("race", |_, _| Ok(3));

        let results = dispatcher.emit_async("race", ()).await.unwrap();
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fails_after_every_subscriber_ran() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();
        let finished = Arc::new(AtomicU32::new(0));

        dispatcher.subscribe("boom", |_, _| Err("kaboom".into()));
        let f = finished.clone();
        dispatcher.subscribe_async("boom", move |_, _| {
            let f = f.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        });

        let err = dispatcher.emit_async("boom", ()).await.unwrap_err();

        assert!(err.to_string().contains("kaboom"));
        assert_eq!(err.index(), Some(0));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_surfaces_first_registered_failure() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();

        dispatcher.subscribe_async("boom", |_, _| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err("slow failure".into())
        });
        dispatcher.subscribe("boom", |_, _| Err("fast failure".into()));

        let err = dispatcher.emit_async("boom", ()).await.unwrap_err();

        assert_eq!(err.index(), Some(0));
        assert!(err.to_string().contains("slow failure"));
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();

        dispatcher.subscribe("boom", |_, _| Ok(1));
        dispatcher.subscribe("boom", |_, _| panic!("subscriber blew up"));

        let err = dispatcher.emit_async("boom", ()).await.unwrap_err();
        assert!(matches!(err, crate::DispatchError::Panicked { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_subscribers_are_deferred() {
        let dispatcher: EventDispatcher<()> = EventDispatcher::new();
        let flag = Arc::new(AtomicBool::new(false));

        let f = flag.clone();
        dispatcher.subscribe("tick", move |_, _| {
            f.store(true, Ordering::SeqCst);
            Ok(())
        });

        let pending = dispatcher.emit_async("tick", ());
        tokio::task::yield_now().await;
        assert!(!flag.load(Ordering::SeqCst));

        pending.await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deferred_on_multi_thread_runtime() {
        let dispatcher: EventDispatcher<()> = EventDispatcher::new();
        let flag = Arc::new(AtomicBool::new(false));

        let f = flag.clone();
        dispatcher.subscribe("tick", move |_, _| {
            f.store(true, Ordering::SeqCst);
            Ok(())
        });

        let pending = dispatcher.emit_async("tick", ());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!flag.load(Ordering::SeqCst));

        pending.await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_open_starts_subscribers_before_polling() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));

        dispatcher.subscribe("tick", move |_, _| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Ok(7)
        });

        let mut pending = dispatcher.emit_async("tick", ());
        assert!(format!("{pending:?}").contains("started: false"));

        pending.open();
        assert!(format!("{pending:?}").contains("started: true"));
        assert!(rx.await.is_ok());

        assert_eq!(pending.await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_dropped_emission_still_runs_subscribers() {
        let dispatcher: EventDispatcher<()> = EventDispatcher::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));

        dispatcher.subscribe("tick", move |_, _| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Ok(())
        });

        drop(dispatcher.emit_async("tick", ()));
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_excludes_late_subscribers() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();
        dispatcher.subscribe("data", |_, _| Ok(1));

        let pending = dispatcher.emit_async("data", ());
        dispatcher.subscribe("data", |_, _| Ok(2));

        assert_eq!(pending.await.unwrap(), vec![1]);
        assert_eq!(dispatcher.subscriber_count("data"), 2);
    }

    #[tokio::test]
    async fn test_no_subscribers_resolves_empty() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();
        let results = dispatcher.emit_async("nobody", ()).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_requires_runtime() {
        let dispatcher: EventDispatcher<(), u32> = EventDispatcher::new();
        dispatcher.subscribe("data", |_, _| Ok(1));

        let result = futures::executor::block_on(dispatcher.emit_async("data", ()));
        assert!(matches!(result, Err(crate::DispatchError::NoRuntime { .. })));
    }
}
