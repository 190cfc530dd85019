//! Classification of requested bundle paths against the current hashes.

use std::fmt;

use super::BundlePath;
use crate::bundle::{Bundle, BundleSet};

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Names a bundle variant with its current hash (or no hash, when none
    /// is stored).
    Valid,
    /// Names a known bundle variant with a stale or missing hash, or under
    /// the wrong prefix. Callers decide whether to serve it anyway.
    Invalid,
    /// Names no bundle, or a variant the bundle does not have.
    Unknown,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
        })
    }
}

/// Parse a request path against the bundle set.
///
/// Between two readings naming bundles, the one matching a published
/// variant and its hash presence is taken.
pub fn parse_request(bundles: &BundleSet, path: &str) -> Option<BundlePath> {
    BundlePath::parse(path, &bundles.prefixes(), |reading| {
        let bundle = bundles.get(&reading.bundle_id)?;
        let state = bundle.state();
        Some(
            state.variants.keys().contains(&reading.variant_key)
                && reading.hash.is_some() == state.hashes.contains_key(&reading.variant_key),
        )
    })
}

/// Classify a request path. Never fails: malformed paths are `Unknown`.
pub fn classify(bundles: &BundleSet, path: &str) -> Validity {
    let Some(request) = parse_request(bundles, path) else {
        return Validity::Unknown;
    };
    let Some(bundle) = bundles.get(&request.bundle_id) else {
        return Validity::Unknown;
    };

    let state = bundle.state();
    if !state.variants.keys().contains(&request.variant_key) {
        return Validity::Unknown;
    }

    match (&request.hash, state.hashes.get(&request.variant_key)) {
        (None, None) => Validity::Valid,
        (Some(requested), Some(current))
            if requested == current && request.prefix == bundle.prefix =>
        {
            Validity::Valid
        }
        _ => Validity::Invalid,
    }
}

/// Current request path of one variant of a bundle.
pub fn request_path(bundle: &Bundle, variant_key: &str) -> String {
    BundlePath::new(
        bundle.prefix.as_str(),
        bundle.id.as_str(),
        variant_key,
        bundle.hash(variant_key),
    )
    .to_string()
}
