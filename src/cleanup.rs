//! Resource cleanup for tests
//!
//! Tests register one cleanup action per remote resource they create. At
//! teardown the actions run newest-first, so dependent resources go before
//! the things they depend on. A failing action does not stop the others.
//!
//! # Example
//!
//! ```ignore
//! use stratus::CleanupRegistry;
//!
//! let cleanup = CleanupRegistry::new();
//!
//! let volume = client.create_volume(1).await?;
//! let key = cleanup.add(format!("delete volume {}", volume.id), {
//!     let client = client.clone();
//!     let id = volume.id.clone();
//!     move || async move { client.delete_volume(&id).await }
//! });
//!
//! // Deleted by the test itself, nothing left to do
//! client.delete_volume(&volume.id).await?;
//! cleanup.cancel(key);
//!
//! cleanup.run_all().await?;
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Set to any value to leave created resources in place after a test
pub const KEEP_ALL_VAR: &str = "STRATUS_KEEP_ALL";

/// Boxed error returned by cleanup actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Action = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Teardown finished, but some cleanup actions failed
#[derive(Debug, thiserror::Error)]
#[error("{failures} cleanup action(s) failed during teardown")]
pub struct TeardownError {
    pub failures: usize,
}

/// Handle for cancelling a registered cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CleanupKey(u64);

struct Entry {
    description: String,
    action: Action,
}

#[derive(Default)]
struct Pending {
    next_key: u64,
    entries: BTreeMap<u64, Entry>,
}

/// Ordered set of pending cleanup actions
#[derive(Default)]
pub struct CleanupRegistry {
    pending: Mutex<Pending>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // A panicking test must not keep its resources alive
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a cleanup action
    ///
    /// `description` shows up in logs, e.g. `"delete volume vol-1"`.
    pub fn add<F, Fut, E>(&self, description: impl Into<String>, action: F) -> CleanupKey
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let action: Action = Box::new(move || {
            async move { action().await.map_err(Into::<BoxError>::into) }.boxed()
        });
        let description = description.into();

        let mut pending = self.lock();
        let key = pending.next_key;
        pending.next_key += 1;
        debug!(key = key, description = %description, "Registered cleanup");
        pending.entries.insert(key, Entry { description, action });
        CleanupKey(key)
    }

    /// Drop a registered action without running it
    ///
    /// Returns false if the key was already run or cancelled.
    pub fn cancel(&self, key: CleanupKey) -> bool {
        self.lock().entries.remove(&key.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run all pending actions, newest first
    pub async fn run_all(&self) -> Result<(), TeardownError> {
        let mut failures = 0usize;
        let mut ran = 0usize;

        loop {
            let next = self.lock().entries.pop_last();
            let Some((key, entry)) = next else {
                break;
            };

            ran += 1;
            debug!(key = key, description = %entry.description, "Cleaning up");
            if let Err(e) = (entry.action)().await {
                failures += 1;
                error!(
                    key = key,
                    description = %entry.description,
                    error = %e,
                    "Cleanup failed"
                );
            }
        }

        if failures > 0 {
            Err(TeardownError { failures })
        } else {
            if ran > 0 {
                info!(actions = ran, "Cleanup finished");
            }
            Ok(())
        }
    }

    /// End-of-test teardown as run by `#[stratus::test]`
    ///
    /// Same as [`run_all`](Self::run_all) unless `STRATUS_KEEP_ALL` is set,
    /// in which case every pending action is left in place.
    pub async fn teardown(&self) -> Result<(), TeardownError> {
        self.teardown_with(std::env::var_os(KEEP_ALL_VAR).is_some()).await
    }

    async fn teardown_with(&self, keep_all: bool) -> Result<(), TeardownError> {
        if keep_all {
            warn!(pending = self.len(), "{} set, keeping resources", KEEP_ALL_VAR);
            return Ok(());
        }
        self.run_all().await
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.lock();
        let descriptions: Vec<&str> = pending
            .entries
            .values()
            .map(|e| e.description.as_str())
            .collect();
        f.debug_struct("CleanupRegistry")
            .field("pending", &descriptions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), BoxError>> {
        let log = log.clone();
        move || {
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_runs_newest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();

        cleanup.add("delete network", recorder(&log, "network"));
        cleanup.add("delete subnet", recorder(&log, "subnet"));
        cleanup.add("delete port", recorder(&log, "port"));

        cleanup.run_all().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["port", "subnet", "network"]);
        assert!(cleanup.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_action_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();

        cleanup.add("delete volume", recorder(&log, "volume"));
        let key = cleanup.add("delete snapshot", recorder(&log, "snapshot"));

        assert!(cleanup.cancel(key));
        assert!(!cleanup.cancel(key));
        assert_eq!(cleanup.len(), 1);

        cleanup.run_all().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["volume"]);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_do_not_stop_teardown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();

        cleanup.add("delete bucket", recorder(&log, "bucket"));
        cleanup.add("delete object", || async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "NoSuchKey"))
        });
        cleanup.add("terminate instance", || async { Err::<(), BoxError>("still running".into()) });

        let err = cleanup.run_all().await.unwrap_err();

        assert_eq!(err.failures, 2);
        assert_eq!(*log.lock().unwrap(), vec!["bucket"]);
        assert!(cleanup.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_runs_pending_actions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();

        cleanup.add("delete keypair", recorder(&log, "keypair"));
        cleanup.add("release address", recorder(&log, "address"));

        cleanup.teardown_with(false).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["address", "keypair"]);
        assert!(cleanup.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_keep_all_leaves_resources() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();

        cleanup.add("delete bucket", recorder(&log, "bucket"));
        cleanup.add("delete object", || async { Err::<(), BoxError>("NoSuchKey".into()) });

        assert!(cleanup.teardown_with(true).await.is_ok());

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(cleanup.len(), 2);
    }

    #[tokio::test]
    async fn test_teardown_reports_failures() {
        let cleanup = CleanupRegistry::new();
        cleanup.add("detach volume", || async { Err::<(), BoxError>("VolumeInUse".into()) });

        let err = cleanup.teardown_with(false).await.unwrap_err();
        assert_eq!(err.to_string(), "1 cleanup action(s) failed during teardown");
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let cleanup = CleanupRegistry::new();
        assert!(cleanup.run_all().await.is_ok());
        assert!(format!("{:?}", cleanup).contains("CleanupRegistry"));
    }
}
