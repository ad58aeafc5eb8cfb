//! Log polling building blocks.
//!
//! The bus owns the timer and the remote calls; this module holds the parts
//! that don't need either:
//! - interval negotiation between callers that want faster polling
//! - cursor advancement and batch assembly from a page of log entries
//! - the single-flight guard that keeps polls from overlapping

mod batch;
mod flight;
mod intervals;

pub use batch::{advance_cursor, collect_batch, filter_convo};
pub use flight::{InFlight, PollStats};
pub(crate) use flight::PollCounters;
pub use intervals::{PollIntervals, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
