//! Tree-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct TreeStats {
    frames: AtomicU64,
    node_updates: AtomicU64,
    events_processed: AtomicU64,
    events_consumed: AtomicU64,
    double_consumed: AtomicU64,
}

/// Point-in-time copy of [`TreeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub frames: u64,
    pub node_updates: u64,
    pub events_processed: u64,
    pub events_consumed: u64,
    /// Times more than one sibling subtree consumed the same event.
    pub double_consumed: u64,
}

impl TreeStats {
    pub(crate) fn record_frame(&self) -> u64 {
        self.frames.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_update(&self) {
        self.node_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_event(&self, consumed: bool) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        if consumed {
            self.events_consumed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_double_consumption(&self) {
        self.double_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            node_updates: self.node_updates.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_consumed: self.events_consumed.load(Ordering::Relaxed),
            double_consumed: self.double_consumed.load(Ordering::Relaxed),
        }
    }
}
