use crate::provider::{ProviderError, ProviderResult};
use std::thread;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Bounded retry for provider calls that fail transiently.
///
/// Errors for which [`ProviderError::is_retryable`] holds are retried, with
/// the delay doubling after each attempt. [`RetryPolicy::on_any_status`]
/// widens this to every non-2xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    any_status: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            any_status: false,
        }
    }

    /// Also retry client errors, e.g. a resource that is not visible yet
    pub fn on_any_status(mut self) -> Self {
        self.any_status = true;
        self
    }

    fn should_retry(&self, error: &ProviderError) -> bool {
        error.is_retryable() || (self.any_status && !(200..300).contains(&error.status))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }

    pub fn run<T, F>(&self, operation: &str, mut call: F) -> ProviderResult<T>
    where
        F: FnMut() -> ProviderResult<T>,
    {
        let mut attempt = 1;
        loop {
            match call() {
                Err(e) if self.should_retry(&e) && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        status = e.status,
                        code = %e.code,
                        delay_ms = delay.as_millis() as u64,
                        "retryable provider error"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
