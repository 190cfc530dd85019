//! Persistence of joined bundle content and the bundle mapping.
//!
//! Content is stored under its variant bundle name (`js/main@fr.js`) as
//! text plus a gzip copy. The mapping records what a restart needs to reuse
//! previous output: per-bundle state and the configuration hash.

mod fs;
mod memory;

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

pub use fs::FsBundleStore;
pub use memory::MemoryBundleStore;

use crate::bundle::BundleState;
use crate::core::{BundlingError, Result};

/// Mapping file name
pub const MAPPING_FILE: &str = "mapping.json";

/// Persisted state of every bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMapping {
    /// Hash of the configuration the states were built with.
    pub config_hash: String,
    /// Bundle id -> published state
    #[serde(default)]
    pub bundles: BTreeMap<String, BundleState>,
}

/// Storage for bundle content.
pub trait BundleStore: Send + Sync {
    /// Store text content and its gzip copy.
    fn store_bundle(&self, name: &str, content: &str) -> Result<()>;

    /// Stored text content. Fails with `NotFound` when absent.
    fn get_bundle(&self, name: &str) -> Result<String>;

    /// Stored bytes, gzip-compressed or plain.
    fn get_bundle_bytes(&self, name: &str, gzip: bool) -> Result<Vec<u8>>;

    fn contains(&self, name: &str) -> bool;

    fn store_mapping(&self, mapping: &BundleMapping) -> Result<()>;

    /// The stored mapping, `None` when none was stored yet.
    fn get_mapping(&self) -> Result<Option<BundleMapping>>;

    fn mapping_exists(&self) -> bool;
}

/// Gzip-compress content.
pub fn gzip(content: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .and_then(|()| encoder.finish())
        .map_err(|e| BundlingError::Store(format!("gzip failed: {e}")))
}
