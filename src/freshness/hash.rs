//! Content hashing for cache busting.
//!
//! The hash of a bundle variant is a pure function of its final joined
//! content, rendered as lowercase hex so it can be embedded in request
//! paths and recognized again when parsing them.

use std::hash::Hasher;
use std::sync::Arc;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a byte slice.
    #[inline]
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Computes the cache-busting hash of joined bundle content.
pub trait BundleHasher: Send + Sync {
    /// Lowercase hex digest of `content`.
    fn hash(&self, content: &[u8]) -> String;
}

/// Truncated blake3 digest.
#[derive(Debug, Clone, Copy)]
pub struct Blake3Hasher {
    length: usize,
}

impl Blake3Hasher {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(1, 64),
        }
    }
}

impl BundleHasher for Blake3Hasher {
    fn hash(&self, content: &[u8]) -> String {
        let mut hex = ContentHash::of(content).to_hex();
        hex.truncate(self.length);
        hex
    }
}

/// 64-bit FxHash fingerprint. Fast, not collision resistant.
#[derive(Debug, Clone, Copy)]
pub struct FxContentHasher {
    length: usize,
}

impl FxContentHasher {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(1, 16),
        }
    }
}

impl BundleHasher for FxContentHasher {
    fn hash(&self, content: &[u8]) -> String {
        let mut hasher = FxHasher::default();
        hasher.write(content);
        let mut hex = format!("{:016x}", hasher.finish());
        hex.truncate(self.length);
        hex
    }
}

/// Hash algorithm selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Fx,
}

impl HashAlgorithm {
    /// Build the hasher for this algorithm.
    pub fn hasher(self, length: usize) -> Arc<dyn BundleHasher> {
        match self {
            Self::Blake3 => Arc::new(Blake3Hasher::new(length)),
            Self::Fx => Arc::new(FxContentHasher::new(length)),
        }
    }
}

/// Hash of a canonical configuration dump, stored with the bundle mapping.
pub fn compute_config_hash(canonical: &str) -> String {
    ContentHash::of(canonical.as_bytes()).to_hex()
}
