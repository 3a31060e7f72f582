//! Per-key requeue backoff for failed reconciles.
//!
//! The reconciler never sleeps or retries itself. When a reconcile fails the
//! error policy asks this tracker how long the scheduler should wait before
//! trying the same key again; a successful reconcile resets the key.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::controller::error::Error;
use crate::controller::events::ReconcileRequest;

/// Exponential backoff configuration.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            multiplier: 2,
        }
    }
}

/// Tracks consecutive failures per Orderer key.
#[derive(Debug, Default)]
pub struct Backoff {
    config: BackoffConfig,
    failures: Mutex<HashMap<ReconcileRequest, u32>>,
}

impl Backoff {
    /// Create a tracker with the given configuration
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure and return the delay before the next attempt.
    ///
    /// Non-retryable errors wait the error's own requeue interval; they only
    /// heal through a spec change, which triggers a reconcile by itself.
    pub fn on_failure(&self, request: &ReconcileRequest, error: &Error) -> Duration {
        let attempts = {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            let count = failures.entry(request.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        if !error.is_retryable() {
            return error.requeue_after();
        }
        self.delay_for(attempts)
    }

    /// Forget failures for a key after a successful reconcile.
    pub fn on_success(&self, request: &ReconcileRequest) {
        self.forget(request);
    }

    /// Drop all state for a key, e.g. once its Orderer is deleted.
    pub fn forget(&self, request: &ReconcileRequest) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request);
    }

    /// Number of keys with a recorded failure.
    pub fn tracked(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Consecutive failures recorded for a key.
    pub fn failures(&self, request: &ReconcileRequest) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request)
            .copied()
            .unwrap_or(0)
    }

    /// Delay for the given number of consecutive failures (1-based).
    fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1);
        let factor = self
            .config
            .multiplier
            .checked_pow(exponent)
            .unwrap_or(u32::MAX);
        self.config
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }
}
