//! Logging setup for stratus
//!
//! Waits log state transitions at `info` and every probe attempt at `debug`;
//! the cleanup registry logs each teardown action at `debug` and failures at
//! `error`. Output goes through the test writer so `cargo test` captures it
//! per test and only prints it for failures.
//!
//! # Example
//!
//! ```no_run
//! use stratus::telemetry::{init_logging, init_probe_logging};
//!
//! // Transitions, timeouts and teardown failures
//! init_logging();
//!
//! // Or: every probe attempt and cleanup step from stratus itself
//! init_probe_logging();
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Default filter for [`init_probe_logging`]
pub const PROBE_FILTER: &str = "info,stratus=debug";

/// Initialize logging with tracing-subscriber
///
/// Uses the RUST_LOG env var for filtering (default: info). Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_logging() {
    install(DEFAULT_FILTER);
}

/// Like [`init_logging`], but shows each probe attempt unless RUST_LOG says otherwise
pub fn init_probe_logging() {
    install(PROBE_FILTER);
}

fn install(default_filter: &str) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let _ = tracing_subscriber::registry()
        .with(filter_from(rust_log.as_deref(), default_filter))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A malformed RUST_LOG falls back to the default rather than silencing output
fn filter_from(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}
