//! Filesystem bundle store.
//!
//! ```text
//! <working_dir>/bundles/
//! ├── text/js/main@fr.js
//! ├── gzip/js/main@fr.js
//! └── mapping.json
//! ```
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so readers never observe a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use super::{BundleMapping, BundleStore, MAPPING_FILE, gzip};
use crate::core::{BundlingError, Result};
use crate::debug;
use crate::utils::path::normalize;

/// Store directory inside the working directory
pub const STORE_DIR: &str = "bundles";

const TEXT_DIR: &str = "text";
const GZIP_DIR: &str = "gzip";

pub struct FsBundleStore {
    dir: PathBuf,
}

impl FsBundleStore {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            dir: working_dir.join(STORE_DIR),
        }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, kind: &str, name: &str) -> Result<PathBuf> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(BundlingError::InvalidPath(name));
        }
        Ok(self.dir.join(kind).join(name))
    }

    /// Remove everything stored.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BundlingError::Io(self.dir.clone(), e)),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BundlingError::Io(parent.to_path_buf(), e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| BundlingError::Io(tmp.clone(), e))?;
    fs::rename(&tmp, path).map_err(|e| BundlingError::Io(path.to_path_buf(), e))
}

fn read(path: &Path, name: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BundlingError::NotFound(name.to_string()),
        _ => BundlingError::Io(path.to_path_buf(), e),
    })
}

impl BundleStore for FsBundleStore {
    fn store_bundle(&self, name: &str, content: &str) -> Result<()> {
        write_atomic(&self.path_of(TEXT_DIR, name)?, content.as_bytes())?;
        write_atomic(&self.path_of(GZIP_DIR, name)?, &gzip(content.as_bytes())?)?;
        debug!("store"; "stored `{}` ({} bytes)", name, content.len());
        Ok(())
    }

    fn get_bundle(&self, name: &str) -> Result<String> {
        let bytes = read(&self.path_of(TEXT_DIR, name)?, name)?;
        String::from_utf8(bytes).map_err(|e| BundlingError::Store(format!("`{name}`: {e}")))
    }

    fn get_bundle_bytes(&self, name: &str, gzip: bool) -> Result<Vec<u8>> {
        let kind = if gzip { GZIP_DIR } else { TEXT_DIR };
        read(&self.path_of(kind, name)?, name)
    }

    fn contains(&self, name: &str) -> bool {
        self.path_of(TEXT_DIR, name).is_ok_and(|p| p.is_file())
    }

    fn store_mapping(&self, mapping: &BundleMapping) -> Result<()> {
        let json = serde_json::to_string_pretty(mapping)
            .map_err(|e| BundlingError::Store(format!("cannot serialize mapping: {e}")))?;
        write_atomic(&self.dir.join(MAPPING_FILE), json.as_bytes())
    }

    fn get_mapping(&self) -> Result<Option<BundleMapping>> {
        let path = self.dir.join(MAPPING_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| BundlingError::Io(path.clone(), e))?;
        let mapping = serde_json::from_str(&json)
            .map_err(|e| BundlingError::Store(format!("corrupt mapping `{}`: {e}", path.display())))?;
        Ok(Some(mapping))
    }

    fn mapping_exists(&self) -> bool {
        self.dir.join(MAPPING_FILE).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleState;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = FsBundleStore::new(dir.path());
        assert!(!store.contains("js/main.js"));

        store.store_bundle("js/main@fr.js", "var a;\n").unwrap();
        assert!(store.contains("js/main@fr.js"));
        assert_eq!(store.get_bundle("js/main@fr.js").unwrap(), "var a;\n");
        assert!(dir.path().join("bundles/gzip/js/main@fr.js").is_file());
        assert!(!dir.path().join("bundles/text/js/main@fr.js.tmp").exists());

        let gz = store.get_bundle_bytes("js/main@fr.js", true).unwrap();
        assert_eq!(&gz[..2], &[0x1f, 0x8b]);

        assert!(matches!(
            store.get_bundle("js/none.js"),
            Err(BundlingError::NotFound(_))
        ));
    }

    #[test]
    fn test_mapping_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsBundleStore::new(dir.path());
        assert!(!store.mapping_exists());
        assert!(store.get_mapping().unwrap().is_none());

        let mut mapping = BundleMapping {
            config_hash: "abc".into(),
            ..BundleMapping::default()
        };
        let mut state = BundleState::default();
        state.hashes.insert(String::new(), "1234".into());
        mapping.bundles.insert("js/main.js".into(), state);
        store.store_mapping(&mapping).unwrap();

        assert!(store.mapping_exists());
        assert_eq!(store.get_mapping().unwrap(), Some(mapping));
    }

    #[test]
    fn test_corrupt_mapping_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FsBundleStore::new(dir.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join(MAPPING_FILE), "{ nope").unwrap();
        assert!(matches!(store.get_mapping(), Err(BundlingError::Store(_))));
    }
}
