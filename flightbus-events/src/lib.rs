//! Per-invocation event dispatch for flightbus handlers
//!
//! This crate provides the in-process publish/subscribe hub every handler
//! uses to decouple "validate this payload" from "react to the outcome".
//!
//! ## Features
//!
//! - **Named events** - any number of subscribers per event name, called in
//!   subscription order
//! - **Sync emission** - [`EventDispatcher::emit`] runs subscribers inline and
//!   stops at the first failure
//! - **Fan-out/fan-in** - [`EventDispatcher::emit_async`] runs every subscriber
//!   on the task queue and aggregates their results
//! - **Isolation** - each dispatcher owns its subscriber table; nothing is
//!   process-wide
//!
//! ## Quick Start
//!
//! ```rust
//! use flightbus_events::EventDispatcher;
//!
//! # tokio_test::block_on(async {
//! let dispatcher: EventDispatcher<String, usize> = EventDispatcher::new();
//!
//! dispatcher.subscribe("handle", |_, msg: &String| Ok(msg.len()));
//! dispatcher.subscribe_async("handle", |_, msg: String| async move {
//!     Ok(msg.split_whitespace().count())
//! });
//!
//! let results = dispatcher
//!     .emit_async("handle", "hello flight bus".to_string())
//!     .await
//!     .unwrap();
//! assert_eq!(results, vec![16, 3]);
//! # });
//! ```
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! match dispatcher.emit_async("handle", msg).await {
//!     Ok(results) => println!("{} subscribers done", results.len()),
//!     Err(DispatchError::Subscriber { index, source, .. }) => {
//!         eprintln!("subscriber {index} failed: {source}");
//!     }
//!     Err(e) => eprintln!("dispatch error: {e}"),
//! }
//! ```

pub mod dispatcher;
pub mod emission;
pub mod subscriber;

pub use dispatcher::{DispatcherBuilder, DispatcherConfig, EventDispatcher};
pub use emission::Emission;
pub use subscriber::{BoxError, DispatchError, SubscriberResult};
