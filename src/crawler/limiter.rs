//! Fetch admission control
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore shared by every transport
//! - A minimum spacing between consecutive fetch dispatches
//!
//! The two are separate steps. A caller may hold a slot from
//! [`FetchLimiter::acquire`] while it waits on something else, and only calls
//! [`FetchLimiter::dispatch`] right before its I/O starts, so the spacing
//! applies to actual fetch starts.
//!
//! Both the semaphore and the pacing lock hand out access in FIFO order, so a
//! waiting fetch is never starved by later arrivals.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A granted fetch slot
///
/// The concurrency slot is released when this value is dropped.
#[derive(Debug)]
pub struct DispatchSlot {
    _permit: OwnedSemaphorePermit,
}

/// Limiter shared by all fetches of a crawl
#[derive(Debug)]
pub struct FetchLimiter {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    /// Maximum number of concurrent fetches
    max_concurrent: usize,

    /// Minimum time between two dispatches
    min_interval: Duration,

    /// When the most recent dispatch was let through
    last_dispatch: Mutex<Option<Instant>>,
}

impl FetchLimiter {
    /// Creates a new limiter
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Maximum number of fetches outstanding at once
    /// * `min_interval` - Minimum spacing between two dispatches
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Waits for a concurrency slot
    ///
    /// # Returns
    ///
    /// * `Some(DispatchSlot)` - A slot is held until the value is dropped
    /// * `None` - The semaphore was closed
    pub async fn acquire(&self) -> Option<DispatchSlot> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(DispatchSlot { _permit: permit })
    }

    /// Waits until `min_interval` has passed since the previous dispatch,
    /// then records this one
    ///
    /// Call this immediately before starting I/O.
    pub async fn dispatch(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Returns the number of slots currently handed out
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
