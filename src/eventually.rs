//! Waiters for probes that are not state machines
//!
//! - [`wait_for_match`] polls text until a regex shows up in it
//! - [`wait_for_success`] polls a fallible call until it stops failing
//! - [`wait_for_failure`] polls a fallible call until it starts failing,
//!   typically to see a deleted resource disappear
//!
//! # Example
//!
//! ```ignore
//! use stratus::eventually::{wait_for_failure, wait_for_match, wait_for_success};
//! use regex::Regex;
//!
//! // Console output eventually mentions the login prompt
//! let line = wait_for_match(|| async { server.console_output().await }, Regex::new(r"login:")?)
//!     .await_match()
//!     .await?;
//!
//! // Keep asking until the address is visible
//! let address = wait_for_success(|| async { client.get_address(&ip).await })
//!     .await_success()
//!     .await?;
//!
//! // Snapshot lookups start failing once it is gone
//! let gone = wait_for_failure(|| async { client.get_snapshot(&id).await })
//!     .await_failure()
//!     .await?;
//! ```

use regex::Regex;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::WaitConfig;

/// Error type for waiters
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E>
where
    E: fmt::Debug + fmt::Display,
{
    #[error("{what} not reached within {timeout:?} ({attempts} attempts over {elapsed:?}): {last}")]
    Timeout {
        what: String,
        last: String,
        attempts: u32,
        elapsed: Duration,
        timeout: Duration,
    },

    #[error("probe failed: {0}")]
    Probe(E),
}

impl<E> WaitError<E>
where
    E: fmt::Debug + fmt::Display,
{
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

/// Outcome of a single probe as seen by a waiter
enum Step<T, E> {
    Done(T),
    Pending(String),
    Abort(E),
}

/// Shared polling loop: probe, classify, sleep, until done or out of time
async fn drive<F, Fut, R, E, T, C>(
    what: &str,
    config: WaitConfig,
    probe: &F,
    mut classify: C,
) -> Result<T, WaitError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: fmt::Debug + fmt::Display,
    C: FnMut(Result<R, E>) -> Step<T, E>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let last = match classify(probe().await) {
            Step::Done(value) => {
                debug!(what = what, attempts = attempts, elapsed = ?start.elapsed(), "Wait finished");
                return Ok(value);
            }
            Step::Abort(e) => return Err(WaitError::Probe(e)),
            Step::Pending(last) => last,
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(WaitError::Timeout {
                what: what.to_string(),
                last,
                attempts,
                elapsed,
                timeout: config.timeout,
            });
        }

        debug!(what = what, attempt = attempts, last = %last, "Not yet, waiting");
        sleep(config.interval.min(config.timeout - elapsed)).await;
    }
}

/// Builder for regex waits
pub struct MatchWait<F, Fut, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    probe: F,
    pattern: Regex,
    config: WaitConfig,
}

/// Wait until the text returned by `probe` contains a match for `pattern`
///
/// Probe errors are not retried.
pub fn wait_for_match<F, Fut, E>(probe: F, pattern: Regex) -> MatchWait<F, Fut, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    MatchWait {
        probe,
        pattern,
        config: WaitConfig::default(),
    }
}

impl<F, Fut, E> MatchWait<F, Fut, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, E>>,
    E: fmt::Debug + fmt::Display,
{
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the matched part of the text
    pub async fn await_match(self) -> Result<String, WaitError<E>> {
        let what = format!("match for /{}/", self.pattern.as_str());
        let pattern = &self.pattern;

        drive(&what, self.config, &self.probe, |result| match result {
            Ok(text) => match pattern.find(&text) {
                Some(m) => Step::Done(m.as_str().to_string()),
                None => Step::Pending(format!("last text {:?}", text)),
            },
            Err(e) => Step::Abort(e),
        })
        .await
    }
}

/// Builder for waits on a call that should start succeeding
pub struct SuccessWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    probe: F,
    retry_if: Option<Box<dyn Fn(&E) -> bool + Send + Sync>>,
    config: WaitConfig,
}

/// Wait until `probe` returns `Ok`
///
/// Every error is retried unless narrowed with
/// [`retry_if`](SuccessWait::retry_if).
pub fn wait_for_success<F, Fut, T, E>(probe: F) -> SuccessWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    SuccessWait {
        probe,
        retry_if: None,
        config: WaitConfig::default(),
    }
}

impl<F, Fut, T, E> SuccessWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Debug + fmt::Display,
{
    /// Only retry errors accepted by `predicate`; others end the wait
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Box::new(predicate));
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn await_success(self) -> Result<T, WaitError<E>> {
        let retry_if = self.retry_if.as_deref();

        drive("success", self.config, &self.probe, |result| match result {
            Ok(value) => Step::Done(value),
            Err(e) if retry_if.map_or(true, |p| p(&e)) => Step::Pending(format!("last error: {}", e)),
            Err(e) => Step::Abort(e),
        })
        .await
    }
}

/// Builder for waits on a call that should start failing
pub struct FailureWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    probe: F,
    config: WaitConfig,
}

/// Wait until `probe` returns `Err`
pub fn wait_for_failure<F, Fut, T, E>(probe: F) -> FailureWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    FailureWait {
        probe,
        config: WaitConfig::default(),
    }
}

impl<F, Fut, T, E> FailureWait<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Debug + fmt::Display,
{
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the first error the probe produced
    pub async fn await_failure(self) -> Result<E, WaitError<E>> {
        drive("failure", self.config, &self.probe, |result| match result {
            Ok(_) => Step::Pending("probe kept succeeding".to_string()),
            Err(e) => Step::Done(e),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_match_returns_matched_text() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let matched = wait_for_match(
            move || {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Ok::<_, String>("booting kernel".to_string())
                    } else {
                        Ok("cirros login: ".to_string())
                    }
                }
            },
            Regex::new(r"\w+ login:").unwrap(),
        )
        .await_match()
        .await
        .unwrap();

        assert_eq!(matched, "cirros login:");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_match_times_out_with_last_text() {
        let err = wait_for_match(
            || async { Ok::<_, String>("still booting".to_string()) },
            Regex::new("login").unwrap(),
        )
        .timeout(Duration::from_secs(5))
        .await_match()
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("still booting"));
        assert!(err.to_string().contains("/login/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let value = wait_for_success(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err("not found".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .interval(Duration::from_millis(10))
        .await_success()
        .await
        .unwrap();

        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_success_aborts_on_unretried_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let err = wait_for_success(move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("forbidden".to_string()) }
        })
        .retry_if(|e: &String| e.contains("not found"))
        .await_success()
        .await
        .unwrap_err();

        match err {
            WaitError::Probe(e) => assert_eq!(e, "forbidden"),
            other => panic!("expected Probe, got {:?}", other),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_success_times_out() {
        let err = wait_for_success(|| async { Err::<(), _>("not found".to_string()) })
            .timeout(Duration::from_secs(3))
            .await_success()
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout { last, attempts, .. } => {
                assert!(last.contains("not found"));
                assert_eq!(attempts, 4);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_failure_returns_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let err = wait_for_failure(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok("snap-1")
                } else {
                    Err("InvalidSnapshot.NotFound".to_string())
                }
            }
        })
        .await_failure()
        .await
        .unwrap();

        assert_eq!(err, "InvalidSnapshot.NotFound");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_failure_times_out() {
        let err = wait_for_failure(|| async { Ok::<_, String>(()) })
            .config(WaitConfig::new().timeout_secs(2))
            .await_failure()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("kept succeeding"));
    }
}
