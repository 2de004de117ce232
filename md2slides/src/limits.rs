//! Resource limiting for protecting system capacity.
//!
//! Every conversion spawns an external process that can run for up to the converter timeout.
//! Without a bound, a burst of requests fans out into an unbounded number of children, so
//! conversions go through a [`ConversionLimiter`] first.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{ConversionLimitsConfig, LimitsConfig};
use crate::errors::{Error, Result};

/// Container for all resource limiters.
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    /// Limiter for concurrent converter processes. None means unlimited.
    pub conversions: Option<Arc<ConversionLimiter>>,
}

impl Limiters {
    /// Creates all limiters from configuration.
    pub fn new(config: &LimitsConfig) -> Self {
        Self {
            conversions: ConversionLimiter::new(&config.conversions).map(Arc::new),
        }
    }

    /// Acquire a conversion slot, or `None` when conversions are unlimited.
    pub async fn acquire_conversion(&self) -> Result<Option<ConversionPermit>> {
        match &self.conversions {
            Some(limiter) => limiter.acquire().await.map(Some),
            None => Ok(None),
        }
    }
}

/// Controls concurrent conversion capacity.
///
/// This limiter implements a bounded queue with configurable concurrency,
/// waiting capacity, and timeout. When limits are exceeded, requests
/// receive HTTP 429 (Too Many Requests).
#[derive(Debug)]
pub struct ConversionLimiter {
    /// Semaphore controlling max concurrent conversions
    semaphore: Arc<Semaphore>,
    /// Current number of requests waiting for a permit
    waiting_count: AtomicUsize,
    /// Maximum allowed waiting requests (None = unlimited)
    max_waiting: Option<usize>,
    /// Maximum time to wait for a permit
    max_wait: Duration,
}

impl ConversionLimiter {
    /// Creates a new conversion limiter from configuration.
    ///
    /// If `max_concurrent` is 0, returns `None` (unlimited conversions).
    /// If `max_waiting` is 0, unlimited waiting is allowed.
    pub fn new(config: &ConversionLimitsConfig) -> Option<Self> {
        if config.max_concurrent == 0 {
            return None;
        }

        Some(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            waiting_count: AtomicUsize::new(0),
            max_waiting: if config.max_waiting == 0 { None } else { Some(config.max_waiting) },
            max_wait: config.max_wait,
        })
    }

    /// Number of conversion slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Attempts to acquire a permit for one conversion.
    ///
    /// Returns `Err(TooManyRequests)` if the waiting queue is full or the
    /// timeout expires before a slot becomes available.
    pub async fn acquire(&self) -> Result<ConversionPermit> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(ConversionPermit { _permit: permit });
        }

        // Join the waiting queue. The guard leaves it again however this future ends, including
        // when the request is dropped while waiting.
        let current_waiting = self.waiting_count.fetch_add(1, Ordering::SeqCst);
        let _waiting = scopeguard::guard(&self.waiting_count, |count| {
            count.fetch_sub(1, Ordering::SeqCst);
        });

        if let Some(max_waiting) = self.max_waiting
            && current_waiting >= max_waiting
        {
            return Err(Error::TooManyRequests {
                message: "Too many conversions in progress. Please retry later.".to_string(),
            });
        }

        // A permit may have been released between the first try and joining the queue
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(ConversionPermit { _permit: permit });
        }

        if self.max_wait.is_zero() {
            return Err(Error::TooManyRequests {
                message: "Too many conversions in progress. Please retry later.".to_string(),
            });
        }

        match tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(ConversionPermit { _permit: permit }),
            Ok(Err(_)) => Err(Error::TooManyRequests {
                message: "Conversion service temporarily unavailable.".to_string(),
            }),
            Err(_) => Err(Error::TooManyRequests {
                message: "Timed out waiting for a conversion slot. Please retry later.".to_string(),
            }),
        }
    }
}

/// RAII guard that releases the conversion slot when dropped.
#[must_use]
pub struct ConversionPermit {
    _permit: OwnedSemaphorePermit,
}
