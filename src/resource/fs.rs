use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::ResourceReader;
use crate::core::{BundlingError, Result};
use crate::freshness::mtime;
use crate::utils::path::{normalize, normalize_fs_path};

/// Reads resources below a single root directory.
#[derive(Debug, Clone)]
pub struct FsResourceReader {
    root: PathBuf,
}

impl FsResourceReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize_fs_path(root.as_ref()),
        }
    }

    /// Map a resource path below the root. `..` cannot escape the root since
    /// the path is normalized first.
    fn locate(&self, path: &str) -> PathBuf {
        let rel = normalize(path);
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel.trim_end_matches('/'))
        }
    }
}

impl ResourceReader for FsResourceReader {
    fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.locate(path);
        std::fs::read(&file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BundlingError::NotFound(path.to_string()),
            _ => BundlingError::Io(file, e),
        })
    }

    fn last_modified(&self, path: &str) -> Option<u64> {
        mtime::last_modified(&self.locate(path))
    }

    fn is_directory(&self, path: &str) -> Result<bool> {
        let file = self.locate(path);
        match file.metadata() {
            Ok(meta) => Ok(meta.is_dir()),
            Err(_) => Err(BundlingError::InvalidPath(path.to_string())),
        }
    }

    fn list_resource_names(&self, dir: &str) -> Result<BTreeSet<String>> {
        let base = self.locate(dir);
        let entries =
            std::fs::read_dir(&base).map_err(|_| BundlingError::InvalidPath(dir.to_string()))?;

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                names.insert(format!("{name}/"));
            } else {
                names.insert(name);
            }
        }
        Ok(names)
    }

    fn real_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.locate(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, FsResourceReader) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js/vendor")).unwrap();
        fs::write(dir.path().join("js/app.js"), "var A=2;").unwrap();
        fs::write(dir.path().join("js/vendor/x.js"), "var X;").unwrap();
        let reader = FsResourceReader::new(dir.path());
        (dir, reader)
    }

    #[test]
    fn test_get_resource() {
        let (_dir, reader) = fixture();
        assert_eq!(reader.get_resource("/js/app.js").unwrap(), "var A=2;");
        assert!(matches!(
            reader.get_resource("js/missing.js"),
            Err(BundlingError::NotFound(_))
        ));
    }

    #[test]
    fn test_directory_queries() {
        let (_dir, reader) = fixture();
        assert!(reader.is_directory("js/").unwrap());
        assert!(!reader.is_directory("js/app.js").unwrap());
        assert!(matches!(
            reader.is_directory("nope"),
            Err(BundlingError::InvalidPath(_))
        ));

        let names: Vec<_> = reader.list_resource_names("js").unwrap().into_iter().collect();
        assert_eq!(names, vec!["app.js", "vendor/"]);
    }

    #[test]
    fn test_last_modified() {
        let (_dir, reader) = fixture();
        assert!(reader.last_modified("js/app.js").is_some());
        assert!(reader.last_modified("js/none.js").is_none());
    }
}
