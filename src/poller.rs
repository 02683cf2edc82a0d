//! State polling for asynchronous remote transitions
//!
//! A probe reports the current state of a remote resource (e.g. a volume's
//! status string). [`wait_for_state`] polls it until the state reaches a
//! target, leaves the set of valid states, or the deadline passes.
//!
//! # Example
//!
//! ```ignore
//! use stratus::poller::wait_for_state;
//! use std::time::Duration;
//!
//! let status = wait_for_state(|| async { client.volume_status("vol-1").await }, "available")
//!     .valid(["creating", "available", "error"])
//!     .interval(Duration::from_secs(1))
//!     .timeout(Duration::from_secs(300))
//!     .await_state()
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::WaitConfig;

/// Error type for state waits
#[derive(Debug, thiserror::Error)]
pub enum PollError<S, E>
where
    S: fmt::Debug,
    E: fmt::Debug + fmt::Display,
{
    #[error(
        "state change timeout exceeded after {elapsed:?} (timeout {timeout:?}, {attempts} attempts): \
         wanted {expected:?}, last state {last:?}"
    )]
    Timeout {
        last: S,
        expected: Vec<S>,
        attempts: u32,
        elapsed: Duration,
        timeout: Duration,
    },

    #[error("unexpected state {value:?}, valid states are {valid:?}")]
    InvalidOutcome { value: S, valid: Vec<S> },

    #[error("probe failed: {0}")]
    Probe(E),
}

impl<S, E> PollError<S, E>
where
    S: fmt::Debug,
    E: fmt::Debug + fmt::Display,
{
    /// Last observed state, if the probe produced one
    pub fn last_state(&self) -> Option<&S> {
        match self {
            PollError::Timeout { last, .. } => Some(last),
            PollError::InvalidOutcome { value, .. } => Some(value),
            PollError::Probe(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    pub fn is_invalid_outcome(&self) -> bool {
        matches!(self, PollError::InvalidOutcome { .. })
    }
}

/// Builder for state waits
pub struct StateWait<F, Fut, S, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    probe: F,
    targets: Vec<S>,
    valid: Option<Vec<S>>,
    config: WaitConfig,
}

/// Wait until `probe` returns `target`
///
/// Default timeout: 60 seconds
/// Default interval: 1 second
pub fn wait_for_state<F, Fut, S, E>(probe: F, target: S) -> StateWait<F, Fut, S, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    wait_for_any_state(probe, [target])
}

/// Wait until `probe` returns any of `targets`
pub fn wait_for_any_state<F, Fut, S, E>(
    probe: F,
    targets: impl IntoIterator<Item = S>,
) -> StateWait<F, Fut, S, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    StateWait {
        probe,
        targets: targets.into_iter().collect(),
        valid: None,
        config: WaitConfig::default(),
    }
}

impl<F, Fut, S, E> StateWait<F, Fut, S, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, E>>,
    S: PartialEq + fmt::Debug,
    E: fmt::Debug + fmt::Display,
{
    /// Restrict the states the probe may report
    ///
    /// Any other state ends the wait with [`PollError::InvalidOutcome`].
    /// Without this, every state counts as "not yet".
    pub fn valid(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.valid = Some(states.into_iter().collect());
        self
    }

    /// Accept one more target state
    pub fn or_state(mut self, target: S) -> Self {
        self.targets.push(target);
        self
    }

    /// Set the polling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Take interval and timeout from a [`WaitConfig`]
    pub fn config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    /// Poll until a target state, an invalid state or the timeout
    pub async fn await_state(self) -> Result<S, PollError<S, E>> {
        let StateWait {
            probe,
            targets,
            valid,
            config,
        } = self;
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut previous: Option<S> = None;

        debug!(
            targets = ?targets,
            timeout = ?config.timeout,
            interval = ?config.interval,
            "Starting state wait"
        );

        loop {
            attempts += 1;
            let state = probe().await.map_err(PollError::Probe)?;

            match &previous {
                Some(prev) if *prev != state => {
                    info!(
                        from = ?prev,
                        to = ?state,
                        elapsed = ?start.elapsed(),
                        "State transition"
                    );
                }
                _ => debug!(attempt = attempts, state = ?state, "Probed state"),
            }

            if targets.contains(&state) {
                info!(
                    state = ?state,
                    attempts = attempts,
                    elapsed = ?start.elapsed(),
                    "State wait finished"
                );
                return Ok(state);
            }

            if valid.as_ref().is_some_and(|v| !v.contains(&state)) {
                warn!(state = ?state, valid = ?valid, "Probe reported an invalid state");
                return Err(PollError::InvalidOutcome {
                    value: state,
                    valid: valid.unwrap_or_default(),
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= config.timeout {
                warn!(
                    last = ?state,
                    attempts = attempts,
                    elapsed = ?elapsed,
                    "State wait timed out"
                );
                return Err(PollError::Timeout {
                    last: state,
                    expected: targets,
                    attempts,
                    elapsed,
                    timeout: config.timeout,
                });
            }

            sleep(config.interval.min(config.timeout - elapsed)).await;
            previous = Some(state);
        }
    }
}
