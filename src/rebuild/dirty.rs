//! Dirty-bundle tracking.
//!
//! Keeps a bidirectional mapping between bundles and the files their last
//! build read, plus the directories whose listing they depend on. A change
//! notification marks every bundle using a changed file dirty, then every
//! composite containing one of those bundles.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bundle::BundleSet;
use crate::debug;
use crate::utils::path::normalize_fs_path;

type IdSet = FxHashSet<String>;
type PathSet = FxHashSet<PathBuf>;

/// Bundle <-> file mapping.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Paths are normalized for reliable matching
#[derive(Debug, Default)]
struct DependencyGraph {
    /// bundle id -> files read by its last build
    forward: FxHashMap<String, PathSet>,
    /// file -> bundles that read it
    reverse: FxHashMap<PathBuf, IdSet>,
    /// directory -> bundles expanding it
    dirs: FxHashMap<PathBuf, IdSet>,
}

impl DependencyGraph {
    /// Record the files and directories of a bundle, replacing older ones.
    fn record<'a>(
        &mut self,
        id: &str,
        files: impl IntoIterator<Item = &'a PathBuf>,
        dirs: impl IntoIterator<Item = &'a PathBuf>,
    ) {
        self.remove(id);

        let files: PathSet = files.into_iter().map(|p| normalize_fs_path(p)).collect();
        for file in &files {
            self.reverse
                .entry(file.clone())
                .or_default()
                .insert(id.to_string());
        }
        self.forward.insert(id.to_string(), files);

        for dir in dirs {
            self.dirs
                .entry(normalize_fs_path(dir))
                .or_default()
                .insert(id.to_string());
        }
    }

    fn remove(&mut self, id: &str) {
        if let Some(old) = self.forward.remove(id) {
            for file in old {
                if let Some(ids) = self.reverse.get_mut(&file) {
                    ids.remove(id);
                    if ids.is_empty() {
                        self.reverse.remove(&file);
                    }
                }
            }
        }
        self.dirs.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Bundles affected by a change of `path`.
    fn used_by(&self, path: &Path) -> IdSet {
        let mut ids = self.reverse.get(path).cloned().unwrap_or_default();
        for (dir, dir_ids) in &self.dirs {
            if path.starts_with(dir) {
                ids.extend(dir_ids.iter().cloned());
            }
        }
        ids
    }
}

/// Marks bundles dirty from filesystem notifications.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    graph: RwLock<DependencyGraph>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read the dependencies of one bundle from its published state.
    pub fn refresh_bundle(&self, bundles: &BundleSet, id: &str) {
        if let Some(bundle) = bundles.get(id) {
            let state = bundle.state();
            self.graph
                .write()
                .record(id, state.linked.keys(), state.watched_dirs.iter());
        }
    }

    /// Re-read the dependencies of every bundle.
    pub fn refresh(&self, bundles: &BundleSet) {
        for bundle in bundles.iter() {
            self.refresh_bundle(bundles, &bundle.id);
        }
    }

    /// Ids of bundles whose last build read `path`.
    pub fn bundles_using(&self, path: &Path) -> Vec<String> {
        let mut ids: Vec<_> = self
            .graph
            .read()
            .used_by(&normalize_fs_path(path))
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    /// Handle changed paths: mark affected bundles and their composite
    /// ancestors dirty.
    ///
    /// Returns the ids that turned dirty with this call, sorted.
    pub fn on_paths_changed(&self, bundles: &BundleSet, paths: &[PathBuf]) -> Vec<String> {
        let affected: IdSet = paths.iter().flat_map(|p| self.bundles_using(p)).collect();

        let mut newly_dirty = Vec::new();
        for id in affected {
            newly_dirty.extend(mark_dirty(bundles, &id));
        }
        newly_dirty.sort();
        newly_dirty.dedup();
        if !newly_dirty.is_empty() {
            debug!("watch"; "dirty: {}", newly_dirty.join(", "));
        }
        newly_dirty
    }
}

/// Mark a bundle and every composite containing it dirty.
///
/// Returns the ids that were clean before.
pub fn mark_dirty(bundles: &BundleSet, id: &str) -> Vec<String> {
    let Some(bundle) = bundles.get(id) else {
        return Vec::new();
    };
    std::iter::once(bundle.clone())
        .chain(bundles.ancestors(id))
        .filter(|b| b.mark_dirty())
        .map(|b| b.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Bundle, BundleState};
    use crate::core::ResourceType;
    use tempfile::TempDir;

    fn clean_set(root: &Path) -> BundleSet {
        let set = BundleSet::new(vec![
            Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
            Bundle::simple("b.js", ResourceType::Js, ["b.js"]),
            Bundle::simple("c.js", ResourceType::Js, ["lib/"]),
            Bundle::composite("all.js", ResourceType::Js, ["a.js", "c.js"]),
        ])
        .unwrap();
        for (id, file) in [("a.js", "a.js"), ("b.js", "b.js"), ("c.js", "lib/x.js")] {
            let mut state = BundleState::default();
            state.linked.insert(root.join(file), 1);
            if id == "c.js" {
                state.watched_dirs.insert(root.join("lib"));
            }
            set.get(id).unwrap().publish(state);
        }
        set.iter().for_each(|b| b.mark_clean());
        set
    }

    #[test]
    fn test_change_propagates_to_composite() {
        let dir = TempDir::new().unwrap();
        let set = clean_set(dir.path());
        let tracker = DirtyTracker::new();
        tracker.refresh(&set);

        let dirty = tracker.on_paths_changed(&set, &[dir.path().join("a.js")]);
        assert_eq!(dirty, ["a.js", "all.js"]);
        assert!(!set.get("b.js").unwrap().is_dirty());

        // Already dirty: nothing new
        assert!(tracker.on_paths_changed(&set, &[dir.path().join("a.js")]).is_empty());
    }

    #[test]
    fn test_new_file_in_directory_member() {
        let dir = TempDir::new().unwrap();
        let set = clean_set(dir.path());
        let tracker = DirtyTracker::new();
        tracker.refresh(&set);

        let dirty = tracker.on_paths_changed(&set, &[dir.path().join("lib/new.js")]);
        assert_eq!(dirty, ["all.js", "c.js"]);
    }

    #[test]
    fn test_refresh_replaces_dependencies() {
        let dir = TempDir::new().unwrap();
        let set = clean_set(dir.path());
        let tracker = DirtyTracker::new();
        tracker.refresh(&set);
        assert_eq!(tracker.bundles_using(&dir.path().join("b.js")), ["b.js"]);

        let mut state = BundleState::default();
        state.linked.insert(dir.path().join("b2.js"), 1);
        set.get("b.js").unwrap().publish(state);
        tracker.refresh_bundle(&set, "b.js");

        assert!(tracker.bundles_using(&dir.path().join("b.js")).is_empty());
        assert_eq!(tracker.bundles_using(&dir.path().join("b2.js")), ["b.js"]);
    }

    #[test]
    fn test_unrelated_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        let set = clean_set(dir.path());
        let tracker = DirtyTracker::new();
        tracker.refresh(&set);
        assert!(tracker.on_paths_changed(&set, &[dir.path().join("zzz.css")]).is_empty());
    }
}
