//! Intake counters exposed by the status endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use jiff::Timestamp;

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    last_event_secs: AtomicI64,
}

/// Number of accepted events and the time of the most recent one.
///
/// Clones share the same counters. Updates are lock free.
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    inner: Arc<Counters>,
}

/// Point-in-time view of [`EventStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events_processed: u64,
    pub last_event_at: Option<Timestamp>,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted event at `at`.
    pub fn record(&self, at: Timestamp) {
        // The timestamp is published before the count so a reader that sees
        // a non-zero count also sees a timestamp. A late writer carrying an
        // older time never moves it backwards.
        self.inner
            .last_event_secs
            .fetch_max(at.as_second(), Ordering::AcqRel);
        self.inner.processed.fetch_add(1, Ordering::AcqRel);
    }

    /// Records an accepted event now.
    pub fn record_now(&self) {
        self.record(Timestamp::now());
    }

    /// Returns the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let events_processed = self.inner.processed.load(Ordering::Acquire);
        let last_event_at = if events_processed == 0 {
            None
        } else {
            Timestamp::from_second(self.inner.last_event_secs.load(Ordering::Acquire)).ok()
        };

        StatsSnapshot {
            events_processed,
            last_event_at,
        }
    }
}
