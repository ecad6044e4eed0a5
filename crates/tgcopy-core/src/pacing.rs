//! Rate-limit handling: inter-message pacing and flood-wait retries.

use std::{future::Future, time::Duration};

use tokio::time::{sleep, Instant};

use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Minimum spacing between the start of two consecutive messages.
    pub min_interval: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// Gate that keeps message starts at least `min_interval` apart.
///
/// The first call passes immediately; later calls wait out whatever is left of the interval
/// since the previous slot.
#[derive(Debug)]
pub struct Pacer {
    limiter: IntervalLimiter,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self {
            limiter: IntervalLimiter::new(policy.min_interval),
        }
    }

    /// Wait time the next slot would need, reserving it.
    pub fn reserve(&mut self) -> Duration {
        self.limiter.reserve()
    }

    pub async fn pace(&mut self) {
        let wait = self.reserve();
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

/// What to do when the platform answers with a flood-wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloodRetryPolicy {
    /// Retries per call; 0 propagates the first flood-wait.
    pub max_retries: u32,
    /// Server waits longer than this are not slept through; the error propagates.
    pub max_wait: Duration,
    /// Lower bound for the wait, doubled on every further attempt.
    pub backoff_floor: Duration,
}

impl Default for FloodRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            max_wait: Duration::from_secs(300),
            backoff_floor: Duration::from_secs(1),
        }
    }
}

impl FloodRetryPolicy {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based) given the server hint.
    pub fn wait_for(&self, attempt: u32, server_hint: Duration) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        server_hint.max(self.backoff_floor.saturating_mul(factor))
    }

    /// Run `op`, sleeping through flood-waits allowed by the policy.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0u32;
        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            match err.retry_after() {
                Some(hint) if attempts < self.max_retries && hint <= self.max_wait => {
                    attempts += 1;
                    let wait = self.wait_for(attempts, hint);
                    tracing::warn!(
                        "{what}: rate limited, retrying in {}s (attempt {attempts}/{})",
                        wait.as_secs(),
                        self.max_retries
                    );
                    sleep(wait).await;
                }
                _ => return Err(err),
            }
        }
    }
}
