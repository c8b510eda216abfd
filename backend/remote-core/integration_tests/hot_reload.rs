use crate::helpers::{RecordingFactory, test_context, test_service, write_whitelist};

use remote_core::{RemoteConfig, UNAUTHORIZED_REASON};

use std::fs::File;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

const POLL_MS: u64 = 20;

/// Wait until `check` holds or the deadline passes.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
    }
    check()
}

/// **VALUE**: Verifies that editing the whitelist file takes effect without a restart.
///
/// **WHY THIS MATTERS**: Operators add new cluster hosts by editing the whitelist. If the
/// running service never notices, the new host is kicked until every server is restarted.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The watcher is never started
/// - The reload reads a cached copy of the file
/// - The gate keeps a reference to the first snapshot instead of the store
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_running_service_when_whitelist_changes_then_new_address_is_allowed() {
    // GIVEN: A running service allowing only 1.2.3.4, polled every 20ms
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"["1.2.3.4"]"#);
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default()
            .with_whitelist_path(&path)
            .with_whitelist_interval(POLL_MS),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    recorder.emit("5.6.7.8", "before");
    assert_eq!(
        recorder.kicks(),
        vec![("before".to_string(), UNAUTHORIZED_REASON.to_string())]
    );

    // WHEN: The file is rewritten with a newer mtime
    write_whitelist(dir.path(), r#"["1.2.3.4", "5.6.7.8"]"#);
    File::options()
        .write(true)
        .open(&path)
        .expect("open whitelist")
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .expect("set mtime");

    let store = service.whitelist().expect("whitelist store").clone();
    assert!(
        eventually(|| store.snapshot().contains("5.6.7.8")).await,
        "Whitelist was not reloaded"
    );

    // THEN: The new address stays connected
    recorder.emit("5.6.7.8", "after");
    assert_eq!(recorder.kicks().len(), 1, "Only the first connection is kicked");

    service.stop(false).await.expect("stop");
}

/// **VALUE**: Verifies that a broken edit keeps the previous list in force.
///
/// **WHY THIS MATTERS**: A half-saved or mistyped file must not open the RPC port to everyone
/// or lock everyone out.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_running_service_when_whitelist_becomes_invalid_then_previous_list_is_kept() {
    // GIVEN: A running service allowing 1.2.3.4
    let dir = TempDir::new().expect("temp dir");
    let path = write_whitelist(dir.path(), r#"["1.2.3.4"]"#);
    let (mut service, recorder) = test_service(
        test_context(dir.path(), "chat", false),
        RemoteConfig::default()
            .with_whitelist_path(&path)
            .with_whitelist_interval(POLL_MS),
        RecordingFactory::default(),
    );
    service.start().await.expect("start");

    // WHEN: The file becomes invalid JSON
    write_whitelist(dir.path(), r#"["1.2.3.4","#);
    File::options()
        .write(true)
        .open(&path)
        .expect("open whitelist")
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .expect("set mtime");
    tokio::time::sleep(Duration::from_millis(POLL_MS * 10)).await;

    // THEN: The original list still applies
    recorder.emit("1.2.3.4", "listed");
    recorder.emit("9.9.9.9", "unlisted");
    assert_eq!(
        recorder.kicks(),
        vec![("unlisted".to_string(), UNAUTHORIZED_REASON.to_string())]
    );

    service.stop(false).await.expect("stop");
}
