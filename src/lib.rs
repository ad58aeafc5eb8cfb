//! # Messages Event Bus
//!
//! Keeps a direct-messaging client in sync with the server's conversation
//! log by polling it, and fans new log entries out to in-process listeners.
//!
//! ## Core Concepts
//!
//! - **Status**: the bus is a small state machine (uninitialized,
//!   initializing, ready, backgrounded, suspended, error)
//! - **Cursor**: the latest revision seen; opaque and lexically ordered
//! - **Trails**: subscriptions to batches of new log entries, globally or
//!   for a single conversation
//! - **Snapshot**: a shared, immutable view of the bus for UI code
//! - **Poll intervals**: callers may ask for faster polling; the fastest
//!   request wins while the bus is ready
//!
//! ## Example
//!
//! ```ignore
//! use messages_event_bus::{BusConfig, EventBus, XrpcClient, XrpcConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let api = Arc::new(XrpcClient::new(XrpcConfig::default())?);
//! let bus = EventBus::new(api, BusConfig {
//!     authorization: "did:plc:alice".into(),
//!     ..Default::default()
//! })?;
//!
//! // The first observer starts the bus
//! let _observer = bus.subscribe(|| println!("bus changed"));
//!
//! // An open conversation wants fresher data
//! let _fast = bus.request_poll_interval(Duration::from_secs(1));
//! let _messages = bus.trail_convo("convo-1", |entries| {
//!     println!("{} new entries", entries.len());
//! });
//! ```

pub mod api;
pub mod bus;
pub mod error;
pub mod listeners;
pub mod poller;
pub mod state;
pub mod types;

// Re-exports
pub use api::{ConvoApi, XrpcClient, XrpcConfig};
pub use bus::{BusConfig, BusSnapshot, EventBus};
pub use error::{ApiError, BusError, BusFault, ErrorCode, Result, Retry};
pub use listeners::{Disposer, ListenerRegistry};
pub use poller::{PollIntervals, PollStats, DEFAULT_POLL_INTERVAL};
pub use state::{BusEvent, BusStatus};
pub use types::*;
