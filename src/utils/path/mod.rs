//! Resource path utilities.
//!
//! Resource paths are `/`-separated strings relative to a reader root
//! (`js/lib.js`, `/css/site.css`). Virtual paths carry a generator prefix
//! (`jar:lib/x.js`) or suffix (`theme.less`) and are never normalized past
//! their prefix.

use std::path::{Path, PathBuf};

/// Separator between a generator prefix and the rest of a virtual path.
pub const PREFIX_SEPARATOR: char = ':';

/// Normalize a resource path: collapse `//`, drop `.` segments, resolve `..`
/// and strip the leading `/`.
///
/// A trailing `/` is kept since it marks a directory member.
pub fn normalize(path: &str) -> String {
    let trailing = path.ends_with('/') && path.len() > 1;
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut out = segments.join("/");
    if trailing && !out.is_empty() {
        out.push('/');
    }
    out
}

/// Join a directory and a relative name, normalizing the result.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return normalize(name);
    }
    normalize(&format!("{}/{}", dir.trim_end_matches('/'), name))
}

/// Directory part of a resource path (`css/a/b.css` -> `css/a`).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// File extension without the dot, if any.
pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').filter(|&i| i > 0).map(|i| &name[i + 1..])
}

/// Path of `target` relative to directory `from_dir` (both normalized,
/// `/`-separated).
pub fn relative_to(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

/// Strip a generator prefix (`jar:css/a.css` -> `css/a.css`).
pub fn strip_generator_prefix(path: &str) -> &str {
    if has_generator_prefix(path)
        && let Some(idx) = path.find(PREFIX_SEPARATOR)
    {
        return &path[idx + 1..];
    }
    path
}

/// Whether the path is a virtual path carrying a generator prefix.
pub fn has_generator_prefix(path: &str) -> bool {
    path.split('/')
        .next()
        .is_some_and(|first| first.contains(PREFIX_SEPARATOR))
}

/// Resolve a path to an absolute, canonical form when it exists.
///
/// Falls back to joining with the current directory so watcher events and
/// tracked paths compare equal even for files that were just removed.
pub fn normalize_fs_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Turn an arbitrary key into a safe file name.
pub fn safe_file_name(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/js//lib.js"), "js/lib.js");
        assert_eq!(normalize("js/./a/../lib.js"), "js/lib.js");
        assert_eq!(normalize("js/vendor/"), "js/vendor/");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn test_join_and_parent() {
        assert_eq!(join("css/theme", "../img/a.png"), "css/img/a.png");
        assert_eq!(join("", "a.css"), "a.css");
        assert_eq!(parent_dir("css/a/b.css"), "css/a");
        assert_eq!(parent_dir("b.css"), "");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("js/app.min.js"), Some("js"));
        assert_eq!(extension("js/.hidden"), None);
        assert_eq!(extension("js/README"), None);
    }

    #[test]
    fn test_generator_prefix() {
        assert!(has_generator_prefix("jar:lib/a.js"));
        assert!(has_generator_prefix("messages:app.messages"));
        assert!(!has_generator_prefix("js/a.js"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("css", "img/a.png"), "../img/a.png");
        assert_eq!(relative_to("css/theme", "css/img/a.png"), "../img/a.png");
        assert_eq!(relative_to("", "img/a.png"), "img/a.png");
        assert_eq!(relative_to("css", "css/a.png"), "a.png");
        assert_eq!(strip_generator_prefix("jar:skin/a.css"), "skin/a.css");
        assert_eq!(strip_generator_prefix("skin/a.css"), "skin/a.css");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("less/theme.less"), "less_theme.less");
        assert_eq!(safe_file_name("jar:x y.css"), "jar_x_y.css");
    }
}
