//! In-memory bundle store.

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{BundleMapping, BundleStore, gzip};
use crate::core::{BundlingError, Result};

/// Keeps content in memory; nothing survives the process.
#[derive(Default)]
pub struct MemoryBundleStore {
    text: DashMap<String, String>,
    gzip: DashMap<String, Vec<u8>>,
    mapping: RwLock<Option<BundleMapping>>,
}

impl MemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.text.len()
    }
}

impl BundleStore for MemoryBundleStore {
    fn store_bundle(&self, name: &str, content: &str) -> Result<()> {
        let compressed = gzip(content.as_bytes())?;
        self.gzip.insert(name.to_string(), compressed);
        self.text.insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn get_bundle(&self, name: &str) -> Result<String> {
        self.text
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| BundlingError::NotFound(name.to_string()))
    }

    fn get_bundle_bytes(&self, name: &str, gzip: bool) -> Result<Vec<u8>> {
        let found = if gzip {
            self.gzip.get(name).map(|c| c.value().clone())
        } else {
            self.text.get(name).map(|c| c.value().as_bytes().to_vec())
        };
        found.ok_or_else(|| BundlingError::NotFound(name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.text.contains_key(name)
    }

    fn store_mapping(&self, mapping: &BundleMapping) -> Result<()> {
        *self.mapping.write() = Some(mapping.clone());
        Ok(())
    }

    fn get_mapping(&self) -> Result<Option<BundleMapping>> {
        Ok(self.mapping.read().clone())
    }

    fn mapping_exists(&self) -> bool {
        self.mapping.read().is_some()
    }
}
