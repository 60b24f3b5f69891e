//! Request pacing for the fetcher
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Spacing request starts by a minimum interval
//!
//! Every request the crawler makes goes through one shared `RequestPacer`, so
//! the limits hold no matter how many detail pages are enriched at once.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A slot for one request; the concurrency slot is released on drop
pub struct PacedPermit {
    _permit: OwnedSemaphorePermit,
}

/// Limits in-flight requests and spaces their start times
pub struct RequestPacer {
    /// Global semaphore for limiting concurrent requests
    permits: Arc<Semaphore>,

    /// Minimum time between two request starts
    min_interval: Duration,

    /// Earliest instant the next request may start
    next_slot: Mutex<Instant>,
}

impl RequestPacer {
    /// Creates a new pacer
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Maximum requests in flight (at least 1)
    /// * `min_interval` - Minimum spacing of request starts; zero disables spacing
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Waits for a concurrency slot and for the request's start time
    ///
    /// # Returns
    ///
    /// * `Some(PacedPermit)` - The request may start now
    /// * `None` - The pacer was closed
    pub async fn acquire(&self) -> Option<PacedPermit> {
        let permit = self.permits.clone().acquire_owned().await.ok()?;

        if !self.min_interval.is_zero() {
            let wait = self.reserve_slot(Instant::now());
            if !wait.is_zero() {
                tracing::trace!("Pacing request for {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        Some(PacedPermit { _permit: permit })
    }

    /// Claims the next start slot and returns how long to wait for it
    fn reserve_slot(&self, now: Instant) -> Duration {
        let mut next = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let start = (*next).max(now);
        *next = start + self.min_interval;
        start - now
    }

    /// Stops handing out permits; pending and future `acquire` calls return None
    pub fn close(&self) {
        self.permits.close();
    }

    /// Number of requests that could start right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
