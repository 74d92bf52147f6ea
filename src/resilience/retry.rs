use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::RetryConfig;
use crate::utils::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl From<Option<&RetryConfig>> for RetrySettings {
    fn from(retry: Option<&RetryConfig>) -> Self {
        let defaults = RetrySettings::default();
        Self {
            attempts: retry.and_then(|r| r.attempts).unwrap_or(defaults.attempts).max(1),
            base_delay_ms: retry.and_then(|r| r.base_delay_ms).unwrap_or(defaults.base_delay_ms),
            max_delay_ms: retry.and_then(|r| r.max_delay_ms).unwrap_or(defaults.max_delay_ms),
        }
    }
}

impl RetrySettings {
    fn next_delay(&self, delay: u64) -> u64 {
        delay.saturating_mul(2).min(self.max_delay_ms)
    }

    /// Run `operation` until it succeeds, `is_retryable` rejects the error,
    /// or the attempts are exhausted. Delay doubles up to `max_delay_ms`.
    pub async fn run_with_retry<F, Fut, T, E, R>(&self, mut operation: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!("giving up after {attempt} attempt(s): {e}");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetrySettings {
        RetrySettings {
            attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result: Result<u32, String> = fast(3)
            .run_with_retry(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 { Err("transient".to_string()) } else { Ok(n) }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = fast(5)
            .run_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("rejected".to_string())
                },
                |_| false,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = fast(2)
            .run_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn config_overrides_defaults() {
        let cfg = RetryConfig {
            attempts: Some(0),
            base_delay_ms: Some(50),
            max_delay_ms: None,
        };
        let settings = RetrySettings::from(Some(&cfg));
        assert_eq!(settings.attempts, 1);
        assert_eq!(settings.base_delay_ms, 50);
        assert_eq!(settings.max_delay_ms, DEFAULT_RETRY_MAX_DELAY_MS);
    }

    #[test]
    fn backoff_doubles_up_to_cap_without_overflow() {
        let settings = RetrySettings {
            attempts: 3,
            base_delay_ms: u64::MAX - 1,
            max_delay_ms: u64::MAX,
        };
        assert_eq!(settings.next_delay(u64::MAX - 1), u64::MAX);
        assert_eq!(fast(3).next_delay(1), 2);
        assert_eq!(fast(3).next_delay(2), 2);
    }
}
