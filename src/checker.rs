//! Polling until a resource reaches an expected state.

use crate::mapping::{MappingError, MappingResult};
use crate::traits::Output;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// State reported by fetch functions when the resource does not exist, so
/// "wait until deleted" and "wait until created" share one checker shape
pub const NOT_FOUND_STATE: &str = "not-found";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Bounded polling loop comparing a fetched state to an expected one.
///
/// The first fetch happens immediately; later ones every `interval`. The
/// loop blocks the calling thread and has no cancellation besides the
/// timeout.
pub struct Checker<F> {
    description: String,
    check_name: String,
    expected: String,
    timeout: Duration,
    interval: Duration,
    fetch: F,
}

impl<F> Checker<F> {
    pub fn new(description: impl Into<String>, expected: impl Into<String>, fetch: F) -> Self {
        let description = description.into();
        Self {
            check_name: description.clone(),
            description,
            expected: expected.into(),
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            fetch,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Name used in error messages (defaults to the description)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.check_name = name.into();
        self
    }

    pub fn check<E>(mut self, output: &dyn Output) -> MappingResult<()>
    where
        F: FnMut() -> Result<String, E>,
        E: fmt::Display,
    {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.timeout {
                return Err(MappingError::Timeout {
                    check: self.check_name.clone(),
                    timeout: self.timeout,
                });
            }

            let state = (self.fetch)().map_err(|e| MappingError::Check {
                check: self.check_name.clone(),
                message: e.to_string(),
            })?;

            if state.to_lowercase() == self.expected.to_lowercase() {
                info!(check = %self.check_name, state = %state, "check succeeded");
                return Ok(());
            }

            let remaining = self.timeout.saturating_sub(started.elapsed());
            debug!(check = %self.check_name, state = %state, expected = %self.expected, "state not reached yet");
            output.dimmed(&format!(
                "{} status '{}', expect '{}', timeout in {} (retry in {})",
                self.description,
                state,
                self.expected,
                format_duration(remaining),
                format_duration(self.interval)
            ));

            thread::sleep(self.interval);
        }
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m{}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockOutput;
    use std::cell::RefCell;

    #[test]
    fn test_immediate_match_returns_without_sleeping() {
        let output = MockOutput::new();
        let started = Instant::now();

        Checker::new("instance i-1", "running", || Ok::<_, String>("RUNNING".to_string()))
            .interval(Duration::from_secs(10))
            .check(&output)
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(output.get_messages().is_empty());
    }

    #[test]
    fn test_polls_until_expected_state() {
        let output = MockOutput::new();
        let states = RefCell::new(vec!["pending", "pending", "running"].into_iter());

        Checker::new("instance i-1", "running", || {
            Ok::<_, String>(states.borrow_mut().next().unwrap_or("running").to_string())
        })
        .timeout(Duration::from_secs(5))
        .interval(Duration::from_millis(5))
        .check(&output)
        .unwrap();

        let progress = output.get_dimmed();
        assert_eq!(progress.len(), 2);
        assert!(progress[0].contains("instance i-1 status 'pending', expect 'running'"));
    }

    #[test]
    fn test_zero_timeout_fails_on_first_tick() {
        let output = MockOutput::new();
        let calls = RefCell::new(0);

        let err = Checker::new("volume vol-1", "available", || {
            *calls.borrow_mut() += 1;
            Ok::<_, String>("creating".to_string())
        })
        .timeout(Duration::ZERO)
        .check(&output)
        .unwrap_err();

        assert!(matches!(err, MappingError::Timeout { .. }));
        assert!(err.to_string().contains("0ns"));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_timeout_bounds() {
        let output = MockOutput::new();
        let timeout = Duration::from_millis(60);
        let interval = Duration::from_millis(20);
        let started = Instant::now();

        let err = Checker::new("stack web", "CREATE_COMPLETE", || {
            Ok::<_, String>("CREATE_IN_PROGRESS".to_string())
        })
        .name("stack web created")
        .timeout(timeout)
        .interval(interval)
        .check(&output)
        .unwrap_err();

        let elapsed = started.elapsed();
        assert!(elapsed >= timeout);
        // generous slack for slow CI machines
        assert!(elapsed < timeout + interval + Duration::from_millis(200));
        assert!(err.to_string().starts_with("check stack web created: timeout of 60ms"));
    }

    #[test]
    fn test_fetch_error_terminates_immediately() {
        let output = MockOutput::new();

        let err = Checker::new("instance i-1", "terminated", || {
            Err::<String, _>("AuthFailure: expired token")
        })
        .check(&output)
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "check instance i-1: AuthFailure: expired token"
        );
    }

    #[test]
    fn test_not_found_sentinel_matches_like_any_state() {
        let output = MockOutput::new();

        Checker::new("instance i-1", NOT_FOUND_STATE, || {
            Ok::<_, String>(NOT_FOUND_STATE.to_string())
        })
        .check(&output)
        .unwrap();
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(175)), "2m55s");
    }
}
