//! Fixed-delay polling used to recover instance IDs.
//!
//! Delays go through a [`Sleeper`] so tests can run with a fake clock.

use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Backoff between lookups, in seconds.
pub const DEFAULT_BACKOFF_SECS: u64 = 30;

/// Attempts made when recovering the ID of a freshly created instance.
pub const PROVISIONING_ATTEMPTS: u32 = 3;

/// Retry policy for polling operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
    /// Wait one backoff interval before the first attempt.
    pub delay_first: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            delay_first: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom settings.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            delay_first: false,
        }
    }

    /// Policy for recovering an ID the create call did not return.
    ///
    /// The API registers the instance asynchronously, so the first lookup
    /// waits one backoff interval.
    pub fn provisioning() -> Self {
        Self {
            max_attempts: PROVISIONING_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            delay_first: true,
        }
    }

    /// Override the attempt count.
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the backoff interval.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Effective number of attempts.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Source of blocking delays.
pub trait Sleeper: Send + Sync {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Fake clock that records requested delays instead of blocking.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.slept().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Poll `attempt_fn` until it yields a value or the policy is exhausted.
///
/// `attempt_fn` receives the 1-indexed attempt number. `Ok(None)` and retryable
/// errors count as a miss; non-retryable errors are returned immediately.
/// Returns `Ok(None)` when every attempt missed.
pub fn poll<T, F>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut attempt_fn: F) -> Result<Option<T>>
where
    F: FnMut(u32) -> Result<Option<T>>,
{
    let attempts = policy.attempts();

    if policy.delay_first {
        sleeper.sleep(policy.backoff);
    }

    for attempt in 1..=attempts {
        match attempt_fn(attempt) {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {
                log::debug!("Attempt {attempt}/{attempts} found nothing");
            }
            Err(e) if e.is_retryable() => {
                log::warn!("Attempt {attempt}/{attempts} failed: {e}");
            }
            Err(e) => return Err(e),
        }

        if attempt < attempts {
            log::warn!(
                "Sleeping for {}s before trying again",
                policy.backoff.as_secs()
            );
            sleeper.sleep(policy.backoff);
        }
    }

    Ok(None)
}
