//! Single-flight guard and poll counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Marks a poll as outstanding for as long as it lives.
///
/// The flag is cleared on drop, so an aborted or panicking poll cannot leave
/// the bus thinking a request is still in flight.
pub struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    /// Claim the flag. Returns `None` if a poll is already running.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Running poll counters.
#[derive(Debug, Default)]
pub(crate) struct PollCounters {
    polls_started: AtomicU64,
    polls_failed: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl PollCounters {
    pub(crate) fn started(&self) {
        self.polls_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a timer tick that found the previous poll still running.
    pub(crate) fn skipped(&self) -> u64 {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn snapshot(&self) -> PollStats {
        PollStats {
            polls_started: self.polls_started.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time poll statistics.
///
/// A growing `ticks_skipped` means responses take longer than the poll
/// interval and the bus is effectively polling slower than requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStats {
    pub polls_started: u64,
    pub polls_failed: u64,
    pub ticks_skipped: u64,
}
