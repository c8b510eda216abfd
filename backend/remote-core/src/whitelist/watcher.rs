//! Modification-time polling for the whitelist file.
//!
//! The watcher stats the file once per interval and fires its callback when
//! the modification time moved forward since the previous observation. A
//! failed stat counts as "no change" and is retried on the next tick.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// Last observed modification time of a watched file.
#[derive(Debug, Clone)]
pub struct WatchState {
    path: PathBuf,
    interval: Duration,
    last_modified: Option<SystemTime>,
}

impl WatchState {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Record the baseline without reporting a change.
    pub fn prime(&mut self, modified: Option<SystemTime>) {
        self.last_modified = modified;
    }

    /// Record `modified` and report whether it is strictly newer than the
    /// previous observation. Without a baseline any observation is newer.
    pub fn observe(&mut self, modified: SystemTime) -> bool {
        let changed = match self.last_modified {
            Some(previous) => modified > previous,
            None => true,
        };
        self.last_modified = Some(modified);
        changed
    }
}

/// Handle to a running poll task. Dropping it stops the polling.
#[derive(Debug)]
pub struct FileWatcher {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Start polling `path` every `interval`, calling `on_change` after each
    /// tick that observed a newer modification time than the file has now.
    ///
    /// `on_change` runs on the blocking pool and is awaited before the next
    /// tick, so invocations never overlap. Must be called inside a Tokio
    /// runtime.
    pub fn watch<F>(path: impl Into<PathBuf>, interval: Duration, on_change: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let path = path.into();
        let baseline = modified_time_now(&path);
        Self::watch_from(path, interval, baseline, on_change)
    }

    /// Like [`FileWatcher::watch`], with the baseline supplied by the caller.
    ///
    /// Pass the modification time read before the file's contents were last
    /// consumed, so a write landing between that read and this call is still
    /// reported on the first tick. `None` makes the first successful stat a
    /// change.
    pub fn watch_from<F>(
        path: impl Into<PathBuf>,
        interval: Duration,
        baseline: Option<SystemTime>,
        on_change: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut state = WatchState::new(path, interval);
        state.prime(baseline);

        info!(
            "Watching {} every {}ms",
            state.path().display(),
            interval.as_millis()
        );

        let token = CancellationToken::new();
        let task = tokio::spawn(poll_loop(state, Arc::new(on_change), token.clone()));

        Self { token, task }
    }

    /// Stop future ticks. A callback already running is allowed to finish.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the poll task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Modification time of `path`, or `None` if it cannot be read.
pub fn modified_time_now(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
}

async fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}

async fn poll_loop<F>(mut state: WatchState, on_change: Arc<F>, token: CancellationToken)
where
    F: Fn() + Send + Sync + 'static,
{
    // `interval_at` panics on a zero period.
    let period = state.interval().max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let modified = match modified_time(state.path()).await {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Stat of {} failed, retrying next tick: {e}", state.path().display());
                continue;
            }
        };

        if !state.observe(modified) {
            continue;
        }

        if token.is_cancelled() {
            break;
        }

        info!("{} changed, reloading", state.path().display());

        let callback = Arc::clone(&on_change);
        if let Err(e) = tokio::task::spawn_blocking(move || callback()).await {
            warn!("Change handler for {} failed: {e}", state.path().display());
        }
    }

    debug!("Stopped watching {}", state.path().display());
}
