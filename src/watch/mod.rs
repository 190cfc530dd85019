//! Filesystem watching.
//!
//! ```text
//! notify ─► channel ─► Debouncer (quiet period) ─► DirtyTracker ─► rebuild_dirty
//! ```
//!
//! The watcher is started before the initial build so changes made while it
//! runs are buffered, not lost.

mod debouncer;
mod roots;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, unbounded};
use notify::RecommendedWatcher;

pub use debouncer::{ChangeKind, Debouncer};
use roots::WatchRoots;

use crate::config::WatchConfig;
use crate::core::CancelToken;
use crate::logger::{status_error, status_success};
use crate::rebuild::{BuildReport, RebuildCoordinator};
use crate::utils::plural_count;
use crate::{debug, log};

/// Upper bound on a single wait, so shutdown is noticed promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct FsWatcher {
    events: Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow.
    watcher: RecommendedWatcher,
    roots: WatchRoots,
    debouncer: Debouncer,
}

impl FsWatcher {
    /// Start watching `paths` recursively. Events buffer until [`run`](Self::run).
    pub fn start(paths: Vec<PathBuf>, config: &WatchConfig) -> notify::Result<Self> {
        let (tx, events) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;

        let mut roots = WatchRoots::new(paths);
        roots.attach_existing(&mut watcher)?;
        debug!("watch"; "watching {}", plural_count(roots.attached(), "root"));

        Ok(Self {
            events,
            watcher,
            roots,
            debouncer: Debouncer::new(config.quiet_period(), config.cooldown()),
        })
    }

    /// Rebuild dirty bundles on every debounced batch of changes until
    /// `shutdown` is cancelled.
    pub fn run(mut self, coordinator: &RebuildCoordinator, shutdown: &CancelToken) {
        log!("watch"; "watching for changes, press Ctrl+C to stop");
        while !shutdown.is_cancelled() {
            let timeout = self.debouncer.sleep_duration().min(POLL_INTERVAL);
            match self.events.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    self.debouncer.add_event(&event);
                    continue;
                }
                Ok(Err(e)) => log!("watch"; "notify error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.roots.maintain(&mut self.watcher);
            if let Some(changes) = self.debouncer.take_if_ready() {
                handle_changes(coordinator, changes);
            }
        }
    }
}

fn handle_changes(coordinator: &RebuildCoordinator, changes: Vec<(PathBuf, ChangeKind)>) {
    let paths: Vec<PathBuf> = changes.into_iter().map(|(path, _)| path).collect();
    let dirty = coordinator.on_paths_changed(&paths);
    if dirty.is_empty() {
        debug!("watch"; "{} changed, no bundle affected", plural_count(paths.len(), "file"));
        return;
    }

    let started = Instant::now();
    match coordinator.rebuild_dirty() {
        Ok(report) => {
            report_status(&report, started);
            // Failed bundles, or changes seen while joining
            let pending = coordinator.dirty_bundles();
            if !pending.is_empty() {
                debug!("watch"; "still dirty: {}", pending.join(", "));
            }
        }
        Err(e) if e.is_interrupted() => log!("build"; "interrupted"),
        Err(e) => status_error("rebuild failed", &e.to_string()),
    }
}

/// Show the outcome of a rebuild in the watch status block.
pub fn report_status(report: &BuildReport, started: Instant) {
    if report.is_success() {
        status_success(&format!(
            "rebuilt {} in {:.0?}",
            plural_count(report.built.len(), "bundle"),
            started.elapsed()
        ));
        return;
    }
    let detail: Vec<String> = report
        .failed
        .iter()
        .map(|(_, message)| message.clone())
        .collect();
    status_error(
        &format!("{} failed", plural_count(report.failed.len(), "bundle")),
        &detail.join("\n"),
    );
}
