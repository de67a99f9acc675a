//! Two-state lifecycle cell shared by components and tree nodes.
//!
//! `Alive --close--> Closed` is the only transition.  It is performed with a
//! single compare-and-swap so exactly one caller wins the teardown, no matter
//! how many threads race on `close()`.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Alive,
    Closed,
}

const ALIVE: u8 = 0;
const CLOSED: u8 = 1;

/// Atomic holder for a [`Lifecycle`].
#[derive(Debug)]
pub struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(ALIVE))
    }

    pub fn get(&self) -> Lifecycle {
        match self.0.load(Ordering::Acquire) {
            ALIVE => Lifecycle::Alive,
            _ => Lifecycle::Closed,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.get() == Lifecycle::Alive
    }

    /// Transition `Alive -> Closed`.
    ///
    /// Returns `true` for the single caller that performed the transition.
    pub fn close(&self) -> bool {
        self.0
            .compare_exchange(ALIVE, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}
