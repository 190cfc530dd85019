//! Access to source resources.
//!
//! The engine never touches the filesystem directly for member content; it
//! goes through a [`ResourceReader`] so tests and alternate roots (classpath
//! directories for `jar:` paths) plug in the same way.

mod fs;

use std::collections::BTreeSet;
use std::path::PathBuf;

pub use fs::FsResourceReader;

use crate::core::Result;

/// Read access to a tree of resources addressed by `/`-separated paths.
pub trait ResourceReader: Send + Sync {
    /// Raw bytes of a resource. Fails with `NotFound` when missing.
    fn get_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Resource decoded as UTF-8 (lossy).
    fn get_resource(&self, path: &str) -> Result<String> {
        let bytes = self.get_bytes(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Last modification time in milliseconds since the epoch.
    fn last_modified(&self, path: &str) -> Option<u64>;

    /// Whether the path names a directory. Fails with `InvalidPath` when the
    /// path does not exist.
    fn is_directory(&self, path: &str) -> Result<bool>;

    /// Names of the direct children of a directory. Subdirectories carry a
    /// trailing `/`.
    fn list_resource_names(&self, dir: &str) -> Result<BTreeSet<String>>;

    /// Absolute filesystem location, when the resource has one.
    ///
    /// Used to match watcher events and to timestamp generator dependencies.
    fn real_path(&self, path: &str) -> Option<PathBuf>;
}
