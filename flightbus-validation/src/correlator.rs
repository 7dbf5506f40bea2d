//! Request/response correlation over a dispatcher.
//!
//! A [`Correlator`] pairs one `validate:<domain>` request with the single
//! outcome the validator emits for it:
//!
//! ```text
//! Idle ──request()──► AwaitingOutcome ──first matching outcome──► Settled
//! ```
//!
//! The `validated` listener runs its downstream effect before settling. Once
//! settled, any further outcome is ignored.

use crate::outcome::{Clean, INVALID, Outcome, VALIDATED, validate_event};
use crate::validator::ValidationSignal;
use flightbus_events::{DispatchError, EventDispatcher};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Correlation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationState {
    /// Dispatcher and validator wired, nothing requested yet
    Idle,
    /// Request emitted, no outcome yet
    AwaitingOutcome,
    /// An outcome resolved the correlation
    Settled,
}

/// Correlation errors
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("no validator attached for domain '{0}'")]
    NoValidator(String),

    #[error("correlation for domain '{0}' was already requested")]
    AlreadyRequested(String),

    #[error("outcome listener for domain '{0}' panicked")]
    ListenerPanicked(String),

    #[error("correlation for domain '{0}' was dropped before settling")]
    Abandoned(String),
}

/// Write-once slot resolving a pending receiver.
///
/// Clones share the slot. Only the first [`settle`](Self::settle) delivers a
/// value; later calls return `false` and do nothing.
pub struct Settlement<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Settlement<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Settlement<T> {
    /// Create a slot and the receiver it resolves.
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (settlement, rx)
    }

    /// Deliver `value` unless already settled.
    pub fn settle(&self, value: T) -> bool {
        match self.sender.lock().take() {
            Some(tx) => {
                // The receiver may be gone; the slot is spent either way.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl<T> std::fmt::Debug for Settlement<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settlement")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Resolves one validation request to exactly one result.
pub struct Correlator<M, R = ()> {
    dispatcher: EventDispatcher<M, R>,
    domain: String,
    state: Arc<Mutex<CorrelationState>>,
}

impl<M, R> Correlator<M, R>
where
    M: ValidationSignal,
    R: Default + Send + 'static,
{
    /// Correlate requests for `domain` on `dispatcher`.
    pub fn new(dispatcher: &EventDispatcher<M, R>, domain: impl Into<String>) -> Self {
        Self {
            dispatcher: dispatcher.clone(),
            domain: domain.into(),
            state: Arc::new(Mutex::new(CorrelationState::Idle)),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn state(&self) -> CorrelationState {
        *self.state.lock()
    }

    /// Emit `validate:<domain>` with `payload` and wait for the outcome.
    ///
    /// `on_validated` receives the normalized record and performs any
    /// downstream work before the correlation settles with its output.
    /// `on_invalid` maps the ordered rule failures. Outcomes for other domains
    /// are ignored.
    ///
    /// # Errors
    ///
    /// - [`CorrelationError::NoValidator`] when nothing listens for the request
    /// - [`CorrelationError::AlreadyRequested`] on a second call
    /// - [`CorrelationError::Dispatch`] when emitting the request fails
    /// - [`CorrelationError::ListenerPanicked`] when `on_validated` panics
    pub async fn request<T, V, Fut, I>(
        &self,
        payload: Value,
        on_validated: V,
        on_invalid: I,
    ) -> Result<T, CorrelationError>
    where
        T: Send + 'static,
        V: Fn(Clean) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        I: Fn(Vec<String>) -> T + Send + Sync + 'static,
    {
        let request_event = validate_event(&self.domain);
        if !self.dispatcher.has_subscribers(&request_event) {
            return Err(CorrelationError::NoValidator(self.domain.clone()));
        }

        {
            let mut state = self.state.lock();
            if *state != CorrelationState::Idle {
                return Err(CorrelationError::AlreadyRequested(self.domain.clone()));
            }
            *state = CorrelationState::AwaitingOutcome;
        }

        let (settlement, settled) = Settlement::<Result<T, CorrelationError>>::channel();
        self.listen_validated(settlement.clone(), on_validated);
        self.listen_invalid(settlement, on_invalid);

        debug!(domain = %self.domain, "Requesting validation");
        self.dispatcher
            .emit(&request_event, &M::from_payload(payload))?;

        settled
            .await
            .unwrap_or_else(|_| Err(CorrelationError::Abandoned(self.domain.clone())))
    }

    fn listen_validated<T, V, Fut>(&self, settlement: Settlement<Result<T, CorrelationError>>, on_validated: V)
    where
        T: Send + 'static,
        V: Fn(Clean) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let domain = self.domain.clone();
        let state = Arc::clone(&self.state);
        let on_validated = Arc::new(on_validated);

        self.dispatcher.subscribe_async(VALIDATED, move |_, message: M| {
            let clean = match message.as_outcome() {
                Some(Outcome::Validated { domain: d, clean }) if *d == domain => Some(clean.clone()),
                _ => None,
            };
            let settlement = settlement.clone();
            let state = Arc::clone(&state);
            let on_validated = Arc::clone(&on_validated);
            let domain = domain.clone();

            async move {
                let Some(clean) = clean else {
                    return Ok(R::default());
                };
                if settlement.is_settled() {
                    warn!(domain = %domain, "Ignoring outcome for settled correlation");
                    return Ok(R::default());
                }

                // Guard the call too: the closure may panic before returning its future.
                let result = AssertUnwindSafe(async move { on_validated(clean).await })
                    .catch_unwind()
                    .await
                    .map_err(|_| CorrelationError::ListenerPanicked(domain.clone()));

                if settlement.settle(result) {
                    *state.lock() = CorrelationState::Settled;
                }
                Ok(R::default())
            }
        });
    }

    fn listen_invalid<T, I>(&self, settlement: Settlement<Result<T, CorrelationError>>, on_invalid: I)
    where
        T: Send + 'static,
        I: Fn(Vec<String>) -> T + Send + Sync + 'static,
    {
        let domain = self.domain.clone();
        let state = Arc::clone(&self.state);

        self.dispatcher.subscribe(INVALID, move |_, message: &M| {
            if let Some(Outcome::Invalid { domain: d, errors }) = message.as_outcome() {
                if *d == domain && !settlement.is_settled() && settlement.settle(Ok(on_invalid(errors.clone()))) {
                    *state.lock() = CorrelationState::Settled;
                }
            }
            Ok(R::default())
        });
    }
}

impl<M, R> std::fmt::Debug for Correlator<M, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("domain", &self.domain)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FlightKey;
    use crate::validator::{GET, INGEST, attach_validators};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone)]
    enum Msg {
        Payload(Value),
        Outcome(Outcome),
    }

    impl ValidationSignal for Msg {
        fn from_payload(payload: Value) -> Self {
            Msg::Payload(payload)
        }

        fn payload(&self) -> Option<&Value> {
            match self {
                Msg::Payload(payload) => Some(payload),
                Msg::Outcome(_) => None,
            }
        }

        fn from_outcome(outcome: Outcome) -> Self {
            Msg::Outcome(outcome)
        }

        fn as_outcome(&self) -> Option<&Outcome> {
            match self {
                Msg::Outcome(outcome) => Some(outcome),
                Msg::Payload(_) => None,
            }
        }
    }

    fn dispatcher() -> EventDispatcher<Msg> {
        let dispatcher = EventDispatcher::new();
        attach_validators(&dispatcher);
        dispatcher
    }

    #[derive(Debug, PartialEq)]
    enum Reply {
        Found(String),
        Rejected(Vec<String>),
    }

    #[test]
    fn test_settlement_is_write_once() {
        let (settlement, mut rx) = Settlement::channel();
        assert!(!settlement.is_settled());

        assert!(settlement.settle(1));
        assert!(!settlement.clone().settle(2));
        assert!(settlement.is_settled());
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_validated_outcome_runs_downstream_then_settles() {
        let correlator = Correlator::new(&dispatcher(), GET);
        assert_eq!(correlator.state(), CorrelationState::Idle);

        let reply = correlator
            .request(
                json!({ "flightId": 42 }),
                |clean| async move {
                    tokio::task::yield_now().await;
                    Reply::Found(clean.as_get().unwrap().flight_id.clone())
                },
                Reply::Rejected,
            )
            .await
            .unwrap();

        assert_eq!(reply, Reply::Found("42".to_string()));
        assert_eq!(correlator.state(), CorrelationState::Settled);
    }

    #[tokio::test]
    async fn test_invalid_outcome_settles() {
        let correlator = Correlator::new(&dispatcher(), GET);

        let reply = correlator
            .request(json!({}), |_| async { Reply::Found(String::new()) }, Reply::Rejected)
            .await
            .unwrap();

        assert_eq!(reply, Reply::Rejected(vec!["flightId required".to_string()]));
        assert_eq!(correlator.state(), CorrelationState::Settled);
    }

    #[tokio::test]
    async fn test_ignores_other_domains() {
        let dispatcher = dispatcher();
        let correlator = Correlator::new(&dispatcher, INGEST);
        let calls = Arc::new(AtomicU32::new(0));

        // An unrelated get outcome fires first on the shared dispatcher.
        let other = Correlator::new(&dispatcher, GET);
        other
            .request(json!({ "flightId": "Z1" }), |_| async { () }, |_| ())
            .await
            .unwrap();

        let c = calls.clone();
        let reply = correlator
            .request(
                json!({ "type": "X", "data": { "flightId": 1 } }),
                move |clean| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async move { clean.as_ingest().is_some() }
                },
                |_| false,
            )
            .await
            .unwrap();

        assert!(reply);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_outcome_is_ignored() {
        let dispatcher = dispatcher();
        let correlator = Correlator::new(&dispatcher, GET);

        let reply = correlator
            .request(json!({}), |_| async { 0 }, |errors| errors.len())
            .await
            .unwrap();
        assert_eq!(reply, 1);

        let stray = Msg::Outcome(Outcome::Validated {
            domain: GET.to_string(),
            clean: Clean::Get(FlightKey {
                flight_id: "late".to_string(),
            }),
        });
        let stray_invalid = Msg::Outcome(Outcome::Invalid {
            domain: GET.to_string(),
            errors: vec![],
        });
        assert!(dispatcher.emit(VALIDATED, &stray).is_ok());
        assert!(dispatcher.emit(INVALID, &stray_invalid).is_ok());
        tokio::task::yield_now().await;
        assert_eq!(correlator.state(), CorrelationState::Settled);
    }

    #[tokio::test]
    async fn test_request_twice_fails() {
        let correlator = Correlator::new(&dispatcher(), GET);
        correlator
            .request(json!({}), |_| async {}, |_| ())
            .await
            .unwrap();

        let err = correlator
            .request(json!({}), |_| async {}, |_| ())
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelationError::AlreadyRequested(_)));
    }

    #[tokio::test]
    async fn test_missing_validator() {
        let dispatcher: EventDispatcher<Msg> = EventDispatcher::new();
        let correlator = Correlator::new(&dispatcher, "cancel");

        let err = correlator
            .request(json!({}), |_| async {}, |_| ())
            .await
            .unwrap_err();
        assert!(matches!(err, CorrelationError::NoValidator(domain) if domain == "cancel"));
        assert_eq!(correlator.state(), CorrelationState::Idle);
    }

    #[tokio::test]
    async fn test_panicking_listener_settles_with_error() {
        let correlator = Correlator::new(&dispatcher(), GET);

        let err = correlator
            .request(
                json!({ "flightId": "A1" }),
                |_| async { panic!("store exploded") },
                |_| (),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CorrelationError::ListenerPanicked(_)));
    }

    #[tokio::test]
    async fn test_listener_panicking_before_its_future_settles_with_error() {
        let correlator = Correlator::new(&dispatcher(), GET);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            correlator.request(
                json!({ "flightId": "A1" }),
                |clean| {
                    let _ = clean.as_ingest().unwrap();
                    async {}
                },
                |_| (),
            ),
        )
        .await
        .expect("correlation should settle");

        assert!(matches!(result, Err(CorrelationError::ListenerPanicked(domain)) if domain == GET));
        assert_eq!(correlator.state(), CorrelationState::Settled);
    }
}
