//! Configuration utility functions.

use std::path::{Path, PathBuf};

use crate::utils::path::normalize_fs_path;

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/app/web/js/   ← cwd
/// /home/user/app/sheaf.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Resolve a configured directory against the project root, expanding `~`.
pub fn resolve_dir(root: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let full = if path.is_relative() { root.join(path) } else { path };
    normalize_fs_path(&full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("web")).unwrap();
        let resolved = resolve_dir(dir.path(), Path::new("web"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("web"));

        let abs = resolve_dir(dir.path(), Path::new("/tmp"));
        assert!(abs.is_absolute());
    }

    #[test]
    fn test_find_absolute_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheaf.toml");
        assert_eq!(find_config_file(&path), None);
        std::fs::write(&path, "").unwrap();
        assert_eq!(find_config_file(&path), Some(path));
    }
}
