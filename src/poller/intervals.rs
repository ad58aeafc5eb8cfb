//! Poll-interval negotiation.

use crate::state::BusStatus;
use crate::types::PollRequestId;
use std::collections::HashMap;
use std::time::Duration;

/// Interval used when nobody asks for anything faster.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Floor for requested intervals; the timer cannot run with a zero period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outstanding poll-interval requests.
///
/// The effective interval is the fastest of the default and every live
/// request, but only while the bus is `Ready`; any other status polls at the
/// default.
#[derive(Debug)]
pub struct PollIntervals {
    default: Duration,
    requests: HashMap<PollRequestId, Duration>,
    next_id: u64,
}

impl PollIntervals {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            requests: HashMap::new(),
            next_id: 1,
        }
    }

    /// Record a request and return its id.
    pub fn request(&mut self, interval: Duration) -> PollRequestId {
        let id = PollRequestId(self.next_id);
        self.next_id += 1;
        self.requests.insert(id, interval.max(MIN_POLL_INTERVAL));
        id
    }

    /// Drop a request. Returns false if it was already released.
    pub fn release(&mut self, id: PollRequestId) -> bool {
        self.requests.remove(&id).is_some()
    }

    /// Fastest interval anyone has asked for.
    pub fn lowest_requested(&self) -> Option<Duration> {
        self.requests.values().copied().min()
    }

    /// Interval the poll timer should run at in `status`.
    pub fn effective(&self, status: BusStatus) -> Duration {
        match status {
            BusStatus::Ready => self
                .lowest_requested()
                .map_or(self.default, |lowest| lowest.min(self.default)),
            _ => self.default,
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
