use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::debug;
use crate::utils::path::normalize_fs_path;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Collects notify events until the quiet period after the last one has
/// passed, so a burst of saves yields one rebuild.
pub struct Debouncer {
    quiet_period: Duration,
    cooldown: Duration,
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration, cooldown: Duration) -> Self {
        Self {
            quiet_period,
            cooldown,
            changes: FxHashMap::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Add a notify event:
    /// - Remove then Create/Modify: restored, the new kind wins
    /// - Modify then Remove: upgraded to Remove
    /// - Create then Remove: dropped
    /// - otherwise the first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Metadata-only changes would retrigger on our own reads
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.add_change(normalize_fs_path(path), kind);
        }
    }

    fn add_change(&mut self, path: PathBuf, kind: ChangeKind) {
        self.last_event = Some(Instant::now());
        let Some(&existing) = self.changes.get(&path) else {
            debug!("watch"; "{}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            return;
        };
        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                self.changes.insert(path, kind);
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                self.changes.insert(path, ChangeKind::Removed);
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
            }
            _ => {}
        }
    }

    /// Take the collected changes once the quiet period and the cooldown
    /// since the last rebuild have both elapsed.
    pub fn take_if_ready(&mut self) -> Option<Vec<(PathBuf, ChangeKind)>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.last_rebuild = Some(Instant::now());

        let mut changes: Vec<_> = std::mem::take(&mut self.changes).into_iter().collect();
        changes.sort();
        Some(changes)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < self.quiet_period {
            return false;
        }
        if let Some(last_rebuild) = self.last_rebuild
            && last_rebuild.elapsed() < self.cooldown
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// Time until the changes could become ready.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        let quiet_remaining = self.quiet_period.saturating_sub(last_event.elapsed());
        let cooldown_remaining = self
            .last_rebuild
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        quiet_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Editor swap and backup files.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
impl ChangeKind {
    fn event(self, path: &Path) -> notify::Event {
        use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
        use notify::EventKind;

        let kind = match self {
            Self::Created => EventKind::Create(CreateKind::File),
            Self::Modified => EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            Self::Removed => EventKind::Remove(RemoveKind::File),
        };
        notify::Event::new(kind).add_path(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const QUIET: Duration = Duration::from_millis(30);

    fn path(name: &str) -> PathBuf {
        PathBuf::from("/nonexistent-sheaf-root").join(name)
    }

    #[test]
    fn test_waits_for_quiet_period() {
        let mut debouncer = Debouncer::new(QUIET, Duration::ZERO);
        debouncer.add_event(&ChangeKind::Modified.event(&path("a.js")));
        assert!(debouncer.take_if_ready().is_none());

        sleep(QUIET * 2);
        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(changes, [(path("a.js"), ChangeKind::Modified)]);
        assert!(debouncer.is_empty());
        assert!(debouncer.take_if_ready().is_none());
    }

    #[test]
    fn test_burst_is_collapsed() {
        let mut debouncer = Debouncer::new(QUIET, Duration::ZERO);
        for _ in 0..5 {
            debouncer.add_event(&ChangeKind::Modified.event(&path("a.js")));
            debouncer.add_event(&ChangeKind::Modified.event(&path("b.js")));
        }
        sleep(QUIET * 2);
        assert_eq!(debouncer.take_if_ready().unwrap().len(), 2);
    }

    #[test]
    fn test_state_transitions() {
        let mut debouncer = Debouncer::new(Duration::ZERO, Duration::ZERO);
        debouncer.add_event(&ChangeKind::Removed.event(&path("restored.js")));
        debouncer.add_event(&ChangeKind::Created.event(&path("restored.js")));
        debouncer.add_event(&ChangeKind::Modified.event(&path("deleted.js")));
        debouncer.add_event(&ChangeKind::Removed.event(&path("deleted.js")));
        debouncer.add_event(&ChangeKind::Created.event(&path("flash.js")));
        debouncer.add_event(&ChangeKind::Removed.event(&path("flash.js")));

        sleep(Duration::from_millis(2));
        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(
            changes,
            [
                (path("deleted.js"), ChangeKind::Removed),
                (path("restored.js"), ChangeKind::Created),
            ]
        );
    }

    #[test]
    fn test_ignores_temp_files_and_metadata() {
        use notify::event::{MetadataKind, ModifyKind};

        let mut debouncer = Debouncer::new(Duration::ZERO, Duration::ZERO);
        debouncer.add_event(&ChangeKind::Modified.event(&path("a.js.swp")));
        debouncer.add_event(&ChangeKind::Modified.event(&path("a.js~")));
        debouncer.add_event(&ChangeKind::Modified.event(&path(".hidden")));
        debouncer.add_event(
            &notify::Event::new(notify::EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::WriteTime,
            )))
            .add_path(path("a.js")),
        );
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_cooldown_between_rebuilds() {
        let mut debouncer = Debouncer::new(Duration::ZERO, Duration::from_secs(60));
        debouncer.add_event(&ChangeKind::Modified.event(&path("a.js")));
        sleep(Duration::from_millis(2));
        assert!(debouncer.take_if_ready().is_some());

        debouncer.add_event(&ChangeKind::Modified.event(&path("a.js")));
        sleep(Duration::from_millis(2));
        assert!(debouncer.take_if_ready().is_none());
        assert!(debouncer.sleep_duration() > Duration::from_secs(50));
    }
}
