//! Mtime-based freshness for source files.
//!
//! Timestamps are stored as milliseconds since the epoch so they survive a
//! round-trip through the persisted mapping files unchanged.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Modification time in milliseconds since the epoch.
pub fn last_modified(path: &Path) -> Option<u64> {
    let time = get_mtime(path)?;
    let millis = time.duration_since(UNIX_EPOCH).ok()?.as_millis();
    u64::try_from(millis).ok()
}

/// Whether a recorded timestamp still matches the file on disk.
///
/// A missing file never matches.
pub fn is_unchanged(path: &Path, recorded: u64) -> bool {
    last_modified(path) == Some(recorded)
}
