//! File-backed cache for expensive generators.
//!
//! Each cache entry records the files the output was derived from together
//! with their modification time. Output is reused only while every recorded
//! timestamp still matches the filesystem. Bundle and debug output are
//! cached independently.
//!
//! Layout below the working directory:
//!
//! ```text
//! generator-cache/<name>/mapping.properties
//! generator-cache/<name>/bundle/<key>
//! generator-cache/<name>/debug/<key>
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::Generated;
use crate::core::{Mode, Result};
use crate::{debug, log};
use crate::freshness::mtime;
use crate::utils::path::safe_file_name;
use crate::variant::{VariantMap, variant_key};

/// Directory below the working directory holding all generator caches.
pub const GENERATOR_CACHE_DIR: &str = "generator-cache";

const MAPPING_FILE: &str = "mapping.properties";
const TIMESTAMP_SEPARATOR: char = '#';
const ENTRY_SEPARATOR: char = ';';
/// Hex digits of the path digest in a cache key.
const KEY_DIGEST_LEN: usize = 12;

/// A dependency of a cached output and its modification time when the
/// output was generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathMapping {
    pub path: PathBuf,
    pub last_modified: u64,
}

impl FilePathMapping {
    /// Record the current timestamp of `path`. `None` if it does not exist.
    pub fn capture(path: &Path) -> Option<Self> {
        mtime::last_modified(path).map(|last_modified| Self {
            path: path.to_path_buf(),
            last_modified,
        })
    }

    pub fn is_fresh(&self) -> bool {
        mtime::is_unchanged(&self.path, self.last_modified)
    }
}

/// Cache key of a generated path for a variant selection.
///
/// A readable file name followed by a digest of the raw path and variant
/// key: distinct paths never share an entry even when their file names do.
pub fn cache_key(path: &str, variants: &VariantMap) -> String {
    let key = variant_key(variants);
    let digest = blake3::hash(format!("{path}\n{key}").as_bytes()).to_hex();
    let readable = if key.is_empty() {
        safe_file_name(path)
    } else {
        safe_file_name(&format!("{path}_{key}"))
    };
    format!("{readable}-{}", &digest[..KEY_DIGEST_LEN])
}

#[derive(Default)]
struct CacheState {
    entries: FxHashMap<String, Vec<FilePathMapping>>,
    /// Entries changed since the mapping was last written.
    dirty: bool,
}

/// Persisted cache of one generator.
pub struct GeneratorCache {
    name: String,
    /// `None` when caching is disabled.
    dir: Option<PathBuf>,
    state: Mutex<CacheState>,
}

impl GeneratorCache {
    /// A cache that never stores anything.
    pub fn disabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Open the cache of generator `name`, loading a previous mapping.
    pub fn open(working_dir: &Path, name: &str) -> Self {
        let dir = working_dir.join(GENERATOR_CACHE_DIR).join(name);
        let entries = load_mapping(&dir.join(MAPPING_FILE)).unwrap_or_else(|line| {
            log!("warn"; "corrupted cache mapping of `{}` at line {}, starting cold", name, line);
            FxHashMap::default()
        });
        debug!("cache"; "`{}` loaded {} cache entries", name, entries.len());
        Self {
            name: name.to_string(),
            dir: Some(dir),
            state: Mutex::new(CacheState {
                entries,
                dirty: false,
            }),
        }
    }

    fn output_file(&self, key: &str, mode: Mode) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(mode.dir_name()).join(key))
    }

    fn entry_key(key: &str, mode: Mode) -> String {
        format!("{}/{key}", mode.dir_name())
    }

    /// Return cached output for `key` if every dependency is unchanged,
    /// otherwise run `generate` and cache its result.
    ///
    /// Failing to write the cache is only a warning; the fresh content is
    /// returned either way.
    pub fn get_or_generate(
        &self,
        key: &str,
        mode: Mode,
        generate: impl FnOnce() -> Result<Generated>,
    ) -> Result<Generated> {
        let entry_key = Self::entry_key(key, mode);

        if let Some(file) = self.output_file(key, mode) {
            let cached = self.state.lock().entries.get(&entry_key).cloned();
            if let Some(mappings) = cached
                && mappings.iter().all(FilePathMapping::is_fresh)
                && let Ok(content) = fs::read_to_string(&file)
            {
                debug!("cache"; "`{}` served `{}` from cache", self.name, key);
                return Ok(Generated {
                    content,
                    linked: mappings.into_iter().map(|m| m.path).collect(),
                });
            }
        }

        let generated = generate()?;

        if let Some(file) = self.output_file(key, mode) {
            if let Err(e) = write_file(&file, &generated.content) {
                log!("warn"; "failed to cache `{}` output for `{}`: {}", self.name, key, e);
                return Ok(generated);
            }
            let mappings = generated
                .linked
                .iter()
                .filter_map(|p| FilePathMapping::capture(p))
                .collect();
            let mut state = self.state.lock();
            state.entries.insert(entry_key, mappings);
            state.dirty = true;
        }
        Ok(generated)
    }

    /// Write the dependency mapping if it changed.
    pub fn flush(&self) {
        let Some(dir) = &self.dir else {
            return;
        };
        let mut state = self.state.lock();
        if !state.dirty {
            return;
        }
        let content = serialize_mapping(&state.entries);
        match write_file(&dir.join(MAPPING_FILE), &content) {
            Ok(()) => state.dirty = false,
            Err(e) => log!("warn"; "failed to write cache mapping of `{}`: {}", self.name, e),
        }
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// `key=path#ts;path#ts`, one line per entry, sorted by key.
fn serialize_mapping(entries: &FxHashMap<String, Vec<FilePathMapping>>) -> String {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    let mut out = String::new();
    for key in keys {
        let value = entries[key]
            .iter()
            .map(|m| {
                format!(
                    "{}{TIMESTAMP_SEPARATOR}{}",
                    m.path.display(),
                    m.last_modified
                )
            })
            .collect::<Vec<_>>()
            .join(&ENTRY_SEPARATOR.to_string());
        let _ = writeln!(out, "{key}={value}");
    }
    out
}

/// Parse a mapping file. A missing file is an empty mapping; a malformed
/// line fails with its 1-based line number.
fn load_mapping(path: &Path) -> std::result::Result<FxHashMap<String, Vec<FilePathMapping>>, usize> {
    let mut entries = FxHashMap::default();
    let Ok(content) = fs::read_to_string(path) else {
        return Ok(entries);
    };

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or(idx + 1)?;
        let mut mappings = Vec::new();
        for item in value.split(ENTRY_SEPARATOR).filter(|s| !s.is_empty()) {
            let (file, ts) = item.rsplit_once(TIMESTAMP_SEPARATOR).ok_or(idx + 1)?;
            let last_modified = ts.parse::<u64>().map_err(|_| idx + 1)?;
            mappings.push(FilePathMapping {
                path: PathBuf::from(file),
                last_modified,
            });
        }
        entries.insert(key.to_string(), mappings);
    }
    Ok(entries)
}
