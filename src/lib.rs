//! Stratus - integration-test harness for cloud infrastructure APIs
//!
//! Stratus provides the pieces integration tests need around a remote cloud
//! platform: waiting for asynchronous state transitions, classifying error
//! responses by status and dotted error code, asserting on them, and cleaning
//! up the resources a test created.
//!
//! # Example (Rust)
//!
//! ```no_run
//! use stratus::matcher::ServiceError;
//! use stratus::poller::wait_for_state;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Wait for a volume to become available
//!     let status = wait_for_state(|| async { Ok::<_, ServiceError>("available") }, "available")
//!         .valid(["creating", "available", "error"])
//!         .timeout(Duration::from_secs(300))
//!         .await_state()
//!         .await?;
//!     println!("volume is {}", status);
//!
//!     // Classify an error response
//!     let ec2 = stratus::catalog::ec2()?;
//!     let err = ServiceError::new(400, "InvalidKeyPair.Duplicate");
//!     assert!(ec2.get("client.InvalidKeyPair").unwrap().matches(&err));
//!
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod eventually;
pub mod matcher;
pub mod poller;
pub mod resource;
pub mod telemetry;

// Re-export commonly used types
pub use assertions::{assert_error, AssertionError};
pub use cleanup::{CleanupKey, CleanupRegistry, TeardownError};
pub use config::{ConfigError, ServiceTimeouts, WaitConfig};
pub use eventually::{wait_for_failure, wait_for_match, wait_for_success, WaitError};
pub use matcher::{ErrorTree, MatchFailure, MatcherNode, Mismatch, RegistrationError, ServiceError};
pub use poller::{wait_for_any_state, wait_for_state, PollError, StateWait};
pub use resource::{wait_resource_state, ResourceKind};
pub use stratus_macros::test;

#[doc(hidden)]
pub mod __private {
    pub use futures::FutureExt;
}
