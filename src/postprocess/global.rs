//! Processors that run once per build batch, across all bundles.

use std::sync::Arc;

use crate::bundle::{Bundle, BundleSet};
use crate::core::{Mode, Result};

/// What a global processor sees of a build batch.
pub struct GlobalContext<'a> {
    pub bundles: &'a BundleSet,
    /// Bundles joined in this batch.
    pub batch: &'a [Arc<Bundle>],
    pub mode: Mode,
    /// Whether every bundle is being built.
    pub full_build: bool,
}

/// A processor hooked around a build batch.
///
/// Pre-processing completes before the first bundle is joined and
/// post-processing starts after the last one.
pub trait GlobalProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Returns ids of additional bundles that must be rebuilt in this batch.
    fn pre_process(&self, _ctx: &GlobalContext<'_>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn post_process(&self, _ctx: &GlobalContext<'_>) -> Result<()> {
        Ok(())
    }
}
