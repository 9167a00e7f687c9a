//! Outstanding-work counter used to detect quiescence
//!
//! A visit is counted from the moment it is launched until its children have
//! been launched in turn. Because a child is counted before its parent is
//! released, the counter can only reach zero once nothing is left to expand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Per-crawl tally of launched but unfinished visits
#[derive(Debug, Default)]
pub struct WorkTracker {
    outstanding: AtomicUsize,
    started: AtomicBool,
}

impl WorkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly launched visit
    pub fn begin(&self) {
        self.started.store(true, Ordering::Release);
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Records a finished visit
    ///
    /// Returns true if this call brought the count back to zero, i.e. the
    /// crawl has become quiescent.
    pub fn finish(&self) -> bool {
        match self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous == 1,
            Err(_) => {
                debug_assert!(false, "WorkTracker::finish called without a matching begin");
                tracing::error!("Work tracker finished more visits than it began");
                false
            }
        }
    }

    /// Number of visits launched but not yet finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// True once work has started and none remains
    pub fn is_quiescent(&self) -> bool {
        self.started.load(Ordering::Acquire) && self.outstanding() == 0
    }
}
