//! `[build]` and `[hash]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! root = "web"                  # Resource root (relative to sheaf.toml)
//! working_dir = ".sheaf"        # Stored bundles, mapping and generator caches
//! debug = false                 # Build debug member lists
//! parallel = false              # Join independent bundles in parallel
//! use_bundle_mapping = true     # Reuse stored hashes across restarts
//!
//! [hash]
//! enabled = true
//! algorithm = "blake3"          # blake3 | fx
//! length = 8                    # Hex characters embedded in request paths
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::freshness::HashAlgorithm;

/// Build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory member paths are resolved against.
    pub root: PathBuf,

    /// Directory for stored bundles, the bundle mapping and generator caches.
    pub working_dir: PathBuf,

    /// Use debug member lists and cache generated output as debug output.
    pub debug: bool,

    /// Join bundles of a batch in parallel.
    pub parallel: bool,

    /// Restore hashes from the stored mapping at startup.
    pub use_bundle_mapping: bool,

    /// Keep joined content in memory and write nothing (`--dry-run`).
    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            working_dir: PathBuf::from(".sheaf"),
            debug: false,
            parallel: false,
            use_bundle_mapping: true,
            dry_run: false,
        }
    }
}

/// Cache-busting hash settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Embed hashes in request paths. When off, only unhashed paths are valid.
    pub enabled: bool,

    pub algorithm: HashAlgorithm,

    /// Number of hex characters kept.
    pub length: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: HashAlgorithm::Blake3,
            length: 8,
        }
    }
}
