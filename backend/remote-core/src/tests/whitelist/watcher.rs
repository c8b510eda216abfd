// Unit tests for mtime comparison and the polling task.

use crate::tests::{FixedInterfaces, write_file};
use crate::whitelist::watcher::{FileWatcher, WatchState};
use crate::whitelist::{PlatformFamily, WhitelistSource, WhitelistStore};

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

const POLL: Duration = Duration::from_millis(20);

fn set_mtime(path: &Path, modified: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .expect("open fixture")
        .set_modified(modified)
        .expect("set mtime");
}

/// Wait until `counter` reaches `expected` or the deadline passes.
async fn wait_for_count(counter: &AtomicUsize, expected: usize) -> usize {
    for _ in 0..200 {
        let value = counter.load(Ordering::SeqCst);
        if value >= expected {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    counter.load(Ordering::SeqCst)
}

/// **VALUE**: Verifies one change per strictly newer observation and none otherwise.
///
/// **WHY THIS MATTERS**: Each reported change triggers a full whitelist reload. Reporting an
/// unchanged or older timestamp as a change would reload on every tick; missing a newer one
/// would leave a stale whitelist in force.
#[test]
fn given_mtime_sequence_when_observing_then_reports_only_strict_increases() {
    // GIVEN: A state primed at t0
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    let t1 = t0 + Duration::from_secs(5);
    let t2 = t1 + Duration::from_secs(5);
    let mut state = WatchState::new("whitelist.json", POLL);
    state.prime(Some(t0));

    // WHEN/THEN: Observing a series of timestamps
    assert!(!state.observe(t0), "Unchanged mtime is not a change");
    assert!(state.observe(t1), "Newer mtime is a change");
    assert!(!state.observe(t1), "Same mtime again is not a change");
    assert!(!state.observe(t0), "Older mtime is not a change");
    assert!(state.observe(t2), "Newer than the last observation is a change");
    assert_eq!(state.last_modified(), Some(t2));
}

/// **VALUE**: Verifies that without a baseline the first observation counts as a change.
///
/// **BUG THIS CATCHES**: Would catch a whitelist file that was missing when watching began
/// never being loaded after it appears.
#[test]
fn given_unprimed_state_when_observing_then_reports_change() {
    let mut state = WatchState::new("whitelist.json", POLL);

    assert!(state.observe(SystemTime::now()));
}

/// **VALUE**: Verifies that the poll task fires the callback after the file is touched.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_running_watcher_when_mtime_advances_then_callback_fires() {
    // GIVEN: A watched file with an old mtime
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", "[]");
    let start = SystemTime::now() - Duration::from_secs(60);
    set_mtime(&path, start);

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let watcher = FileWatcher::watch(&path, POLL, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // WHEN: The mtime moves forward
    set_mtime(&path, start + Duration::from_secs(10));

    // THEN: Exactly one reload is observed
    assert_eq!(wait_for_count(&reloads, 1).await, 1);
    tokio::time::sleep(POLL * 5).await;
    assert_eq!(reloads.load(Ordering::SeqCst), 1, "No further reloads without changes");

    watcher.cancel();
}

/// **VALUE**: Verifies that an unchanged file never triggers the callback.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_untouched_file_when_polling_then_callback_never_fires() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", "[]");

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let _watcher = FileWatcher::watch(&path, POLL, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(POLL * 10).await;

    assert_eq!(reloads.load(Ordering::SeqCst), 0);
}

/// **VALUE**: Verifies that cancelling stops future ticks.
///
/// **BUG THIS CATCHES**: Would catch a stopped service continuing to reload its whitelist.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_cancelled_watcher_when_mtime_advances_then_callback_does_not_fire() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", "[]");
    let start = SystemTime::now() - Duration::from_secs(60);
    set_mtime(&path, start);

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let watcher = FileWatcher::watch(&path, POLL, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    watcher.cancel();
    assert!(watcher.is_cancelled());
    set_mtime(&path, start + Duration::from_secs(10));
    tokio::time::sleep(POLL * 10).await;

    assert_eq!(reloads.load(Ordering::SeqCst), 0);
    assert!(watcher.is_finished(), "Poll task should exit after cancel");
}

/// **VALUE**: Verifies that stat failures are retried instead of ending the watch.
///
/// **WHY THIS MATTERS**: Editors often replace a file by delete-and-rename. The file is briefly
/// missing; the watcher must survive that window and pick up the new file.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_missing_file_when_it_appears_then_callback_fires() {
    // GIVEN: A watcher on a file that does not exist yet
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("whitelist.json");

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let watcher = FileWatcher::watch(&path, POLL, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    tokio::time::sleep(POLL * 3).await;
    assert_eq!(reloads.load(Ordering::SeqCst), 0);

    // WHEN: The file is created
    write_file(dir.path(), "whitelist.json", "[]");

    // THEN: The watcher is still alive and reports it
    assert!(wait_for_count(&reloads, 1).await >= 1);
    assert!(!watcher.is_finished());
}

/// **VALUE**: Verifies that an edit landing between the initial load and the start of
/// watching is still picked up.
///
/// **WHY THIS MATTERS**: Startup loads the whitelist and only then starts the watcher. If the
/// watcher took the file's mtime at that later point as its baseline, an edit made in between
/// would look unchanged forever and the stale list would stay in force until some unrelated
/// later write.
///
/// **BUG THIS CATCHES**: Would catch the watcher baseline being read after the load instead of
/// before it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_edit_between_load_and_watch_when_polling_then_edit_is_applied() {
    // GIVEN: A store opened on the first list
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["1.1.1.1"]"#);
    let source = WhitelistSource::new(&path)
        .with_platform(PlatformFamily::Other)
        .with_interfaces(Arc::new(FixedInterfaces::default()));
    let store = WhitelistStore::open(source).expect("open store");

    // WHEN: The file is edited before the watcher starts
    write_file(dir.path(), "whitelist.json", r#"["2.2.2.2"]"#);
    set_mtime(&path, SystemTime::now() + Duration::from_secs(10));

    let reload_store = store.clone();
    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let _watcher = FileWatcher::watch_from(&path, POLL, store.opened_modified(), move || {
        reload_store.reload().expect("reload");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // THEN: The first tick reloads and the edit is in force
    assert_eq!(wait_for_count(&reloads, 1).await, 1);
    assert!(store.snapshot().contains("2.2.2.2"));
    assert!(!store.snapshot().contains("1.1.1.1"));
}

/// **VALUE**: Verifies that the load-time baseline does not cause a reload when nothing
/// changed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_untouched_file_when_watching_from_load_baseline_then_no_reload() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["1.1.1.1"]"#);
    let source = WhitelistSource::new(&path)
        .with_platform(PlatformFamily::Other)
        .with_interfaces(Arc::new(FixedInterfaces::default()));
    let store = WhitelistStore::open(source).expect("open store");
    assert!(store.opened_modified().is_some());

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    let _watcher = FileWatcher::watch_from(&path, POLL, store.opened_modified(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    tokio::time::sleep(POLL * 10).await;

    assert_eq!(reloads.load(Ordering::SeqCst), 0);
}
