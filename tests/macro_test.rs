//! Integration tests using the #[stratus::test] macro

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[allow(unused_imports)] // Used in macro-expanded function signatures
use stratus::CleanupRegistry;
use stratus::{catalog, poller, ServiceError};

/// Test using the #[stratus::test] macro
/// The macro automatically:
/// - Installs logging
/// - Injects an empty CleanupRegistry as `cleanup`
/// - Runs it after the body
#[stratus::test]
async fn test_macro_injects_cleanup(cleanup: CleanupRegistry) {
    assert!(cleanup.is_empty());

    cleanup.add("noop teardown", || async { Ok::<(), ServiceError>(()) });

    assert_eq!(cleanup.len(), 1);
}

/// Result-returning tests can use `?` on harness errors
#[stratus::test]
async fn test_macro_with_result(cleanup: CleanupRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let ec2 = catalog::ec2()?;
    let probes = Arc::new(AtomicU32::new(0));
    let p = probes.clone();

    let state = poller::wait_for_state(
        move || {
            let n = p.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok("pending")
                } else {
                    Ok::<_, ServiceError>("running")
                }
            }
        },
        "running",
    )
    .interval(Duration::from_millis(10))
    .await_state()
    .await?;
    assert_eq!(state, "running");

    let node = ec2.get("client.InvalidInstanceID.NotFound").unwrap();
    let key = cleanup.add("terminate instance", || async { Ok::<(), ServiceError>(()) });
    assert!(cleanup.cancel(key));
    assert!(node.matches(&ServiceError::new(400, "InvalidInstanceID.NotFound")));

    Ok(())
}

/// Test without cleanup parameter - should just work as regular async test
#[stratus::test]
async fn test_macro_without_cleanup() {
    // No registry needed - macro just wraps with #[tokio::test]
    let x = 1 + 1;
    assert_eq!(x, 2);
}

/// Panics still fail the test after cleanup has run
#[stratus::test]
#[should_panic(expected = "boom")]
async fn test_macro_reraises_panics(cleanup: CleanupRegistry) {
    cleanup.add("noop", || async { Ok::<(), ServiceError>(()) });
    panic!("boom");
}

/// A body that returns Err fails with the error text, not a bare FAILED
#[stratus::test]
#[should_panic(expected = "test returned error: ServiceError { status: 404, code: \"NoSuchBucket\"")]
async fn test_macro_reports_returned_error(cleanup: CleanupRegistry) -> Result<(), ServiceError> {
    cleanup.add("delete bucket", || async { Ok::<(), ServiceError>(()) });
    Err(ServiceError::new(404, "NoSuchBucket"))
}

/// A passing body still fails when teardown does
#[stratus::test]
#[should_panic(expected = "teardown failed: 1 cleanup action(s) failed")]
async fn test_macro_fails_on_teardown_error(cleanup: CleanupRegistry) {
    cleanup.add("terminate instance", || async {
        Err::<(), ServiceError>(ServiceError::new(400, "IncorrectInstanceState"))
    });
}

/// Registered actions run after the body, newest first
///
/// The older action fails only if the newer one already ran, so the expected
/// teardown panic shows both that cleanup ran and that it ran in order.
#[stratus::test]
#[should_panic(expected = "teardown failed: 1 cleanup action(s) failed")]
async fn test_macro_runs_cleanup_newest_first(cleanup: CleanupRegistry) {
    let subnet_deleted = Arc::new(AtomicBool::new(false));

    let seen = subnet_deleted.clone();
    cleanup.add("delete vpc", move || async move {
        if seen.load(Ordering::SeqCst) {
            Err(ServiceError::new(400, "DependencyViolation"))
        } else {
            Ok(())
        }
    });

    let flag = subnet_deleted.clone();
    cleanup.add("delete subnet", move || async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<(), ServiceError>(())
    });

    assert!(!subnet_deleted.load(Ordering::SeqCst));
}
