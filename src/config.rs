//! Wait configuration for stratus
//!
//! These types define how long and how often waits poll the system under test.
//! Build them programmatically, or pick them up from the environment in CI.
//!
//! # Example
//!
//! ```
//! use stratus::config::{ServiceTimeouts, WaitConfig};
//! use std::time::Duration;
//!
//! let wait = WaitConfig::new()
//!     .interval(Duration::from_millis(500))
//!     .timeout_secs(120);
//!
//! let timeouts = ServiceTimeouts::default().compute(wait);
//! assert_eq!(timeouts.compute.timeout, Duration::from_secs(120));
//! ```

use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} (expected whole seconds)")]
    InvalidValue { key: String, value: String },
}

/// Polling interval and deadline for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between two probes
    pub interval: Duration,

    /// Total time allowed before the wait gives up
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WaitConfig {
    /// Create a wait config with the default 1s interval and 60s timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the polling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set the polling interval in seconds
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.interval = Duration::from_secs(secs);
        self
    }
}

/// Per-service wait settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTimeouts {
    /// Servers building, resizing, terminating
    pub compute: WaitConfig,

    /// Volumes and snapshots
    pub volume: WaitConfig,

    /// EC2/S3-compatible API resources
    pub boto: WaitConfig,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            compute: WaitConfig::new().interval_secs(10).timeout_secs(400),
            volume: WaitConfig::new().interval_secs(10).timeout_secs(300),
            boto: WaitConfig::default(),
        }
    }
}

impl ServiceTimeouts {
    /// Create the default per-service settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compute wait settings
    pub fn compute(mut self, config: WaitConfig) -> Self {
        self.compute = config;
        self
    }

    /// Set volume wait settings
    pub fn volume(mut self, config: WaitConfig) -> Self {
        self.volume = config;
        self
    }

    /// Set EC2/S3 wait settings
    pub fn boto(mut self, config: WaitConfig) -> Self {
        self.boto = config;
        self
    }

    /// Load settings from `STRATUS_<SERVICE>_BUILD_INTERVAL` and
    /// `STRATUS_<SERVICE>_BUILD_TIMEOUT`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            compute: service_from_lookup(&lookup, "COMPUTE", defaults.compute)?,
            volume: service_from_lookup(&lookup, "VOLUME", defaults.volume)?,
            boto: service_from_lookup(&lookup, "BOTO", defaults.boto)?,
        })
    }
}

fn service_from_lookup<F>(
    lookup: &F,
    service: &str,
    mut config: WaitConfig,
) -> Result<WaitConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secs) = seconds_var(lookup, &format!("STRATUS_{}_BUILD_INTERVAL", service))? {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = seconds_var(lookup, &format!("STRATUS_{}_BUILD_TIMEOUT", service))? {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

fn seconds_var<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_wait_config_defaults() {
        let config = WaitConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_wait_config_builder() {
        let config = WaitConfig::new()
            .interval(Duration::from_millis(250))
            .timeout_secs(5);

        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_service_timeouts_defaults() {
        let timeouts = ServiceTimeouts::default();
        assert_eq!(timeouts.compute.timeout, Duration::from_secs(400));
        assert_eq!(timeouts.volume.interval, Duration::from_secs(10));
        assert_eq!(timeouts.boto, WaitConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let lookup = lookup_from(&[
            ("STRATUS_COMPUTE_BUILD_INTERVAL", "3"),
            ("STRATUS_BOTO_BUILD_TIMEOUT", " 90 "),
        ]);

        let timeouts = ServiceTimeouts::from_lookup(lookup).unwrap();
        assert_eq!(timeouts.compute.interval, Duration::from_secs(3));
        assert_eq!(timeouts.compute.timeout, Duration::from_secs(400));
        assert_eq!(timeouts.boto.timeout, Duration::from_secs(90));
        assert_eq!(timeouts.volume, ServiceTimeouts::default().volume);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let lookup = lookup_from(&[("STRATUS_VOLUME_BUILD_TIMEOUT", "ten")]);

        match ServiceTimeouts::from_lookup(lookup) {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "STRATUS_VOLUME_BUILD_TIMEOUT");
                assert_eq!(value, "ten");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
