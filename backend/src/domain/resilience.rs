//! Time bounds and read retries for storage calls.
//!
//! Every storage call a service makes goes through [`StoragePolicy`]: it is
//! cut off after the configured request timeout, and reads (never writes) are
//! retried with exponential backoff while the failure stays transient.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Async sleep used between read attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio-backed sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Failure classification used to decide whether a read may be retried.
pub trait Transience {
    fn is_transient(&self) -> bool;
}

impl Transience for super::Error {
    fn is_transient(&self) -> bool {
        self.code() == super::ErrorCode::Transient
    }
}

/// A storage call exceeded the request timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{operation} timed out after {after:?}")]
pub struct TimedOut {
    pub operation: &'static str,
    pub after: Duration,
}

/// Default number of attempts for idempotent reads.
pub const DEFAULT_READ_ATTEMPTS: u32 = 3;
/// Default ceiling for a single storage call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

/// Timeout and retry settings shared by the domain services.
#[derive(Clone)]
pub struct StoragePolicy {
    timeout: Duration,
    read_attempts: u32,
    base_delay: Duration,
    sleeper: Arc<dyn RetrySleeper>,
}

impl Default for StoragePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_READ_ATTEMPTS)
    }
}

impl std::fmt::Debug for StoragePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePolicy")
            .field("timeout", &self.timeout)
            .field("read_attempts", &self.read_attempts)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl StoragePolicy {
    /// Policy with the Tokio sleeper; `read_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(timeout: Duration, read_attempts: u32) -> Self {
        Self {
            timeout,
            read_attempts: read_attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn RetrySleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `fut`, giving up once the request timeout elapses.
    pub async fn bounded<F>(&self, operation: &'static str, fut: F) -> Result<F::Output, TimedOut>
    where
        F: Future,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| TimedOut {
                operation,
                after: self.timeout,
            })
    }

    /// Run an idempotent read, retrying transient failures.
    ///
    /// `attempt` is invoked afresh for each try, so it must not carry side
    /// effects. Non-transient failures return immediately.
    pub async fn read<T, E, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transience + std::fmt::Display,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(error) if error.is_transient() && tries < self.read_attempts => {
                    let delay = self.backoff(tries);
                    debug!(operation, attempt = tries, ?delay, %error, "retrying transient read");
                    self.sleeper.sleep(delay).await;
                    tries += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}
