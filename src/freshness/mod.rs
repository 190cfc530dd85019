//! Freshness detection: content hashes for bundles, mtimes for sources.
//!
//! - **content-hash**: cache-busting identifier of joined bundle content
//! - **mtime**: staleness of generator dependencies and linked resources

mod hash;
pub mod mtime;

pub use hash::{
    Blake3Hasher, BundleHasher, ContentHash, FxContentHasher, HashAlgorithm, compute_config_hash,
};
