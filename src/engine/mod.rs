//! Join and post-process engine.
//!
//! Turns a bundle into stored content, one output per variant:
//!
//! ```text
//! members ──► read / generate ──► unitary post-process ──► concat
//!                                                            │
//!            store + hash ◄── bundle post-process ◄──────────┘
//! ```
//!
//! Bundles whose processors reveal variants at join time are joined twice
//! (see [`BundlingEngine::build_bundle`]). Composite bundles join each child
//! the same way and post-process the concatenation again.

mod build;
mod join;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub use build::LIVE_PLACEHOLDER;
pub use join::ResolvedMembers;

use crate::bundle::Bundle;
use crate::core::Mode;
use crate::freshness::BundleHasher;
use crate::generator::GeneratorRegistries;
use crate::postprocess::PostProcessor;
use crate::resource::ResourceReader;
use crate::store::BundleStore;

/// Files a build read, with their modification time (millis).
pub type LinkedFiles = BTreeMap<PathBuf, u64>;

/// Post-processor chains used by bundles that do not configure their own.
#[derive(Clone, Default)]
pub struct DefaultProcessors {
    pub unitary: Option<Arc<dyn PostProcessor>>,
    pub bundle: Option<Arc<dyn PostProcessor>>,
    pub composite_unitary: Option<Arc<dyn PostProcessor>>,
    pub composite_bundle: Option<Arc<dyn PostProcessor>>,
}

pub struct BundlingEngine {
    reader: Arc<dyn ResourceReader>,
    registries: Arc<GeneratorRegistries>,
    store: Arc<dyn BundleStore>,
    /// `None` when hashing is disabled.
    hasher: Option<Arc<dyn BundleHasher>>,
    defaults: DefaultProcessors,
    mode: Mode,
}

impl BundlingEngine {
    pub fn new(
        reader: Arc<dyn ResourceReader>,
        registries: Arc<GeneratorRegistries>,
        store: Arc<dyn BundleStore>,
    ) -> Self {
        Self {
            reader,
            registries,
            store,
            hasher: None,
            defaults: DefaultProcessors::default(),
            mode: Mode::Bundle,
        }
    }

    pub fn with_hasher(mut self, hasher: Option<Arc<dyn BundleHasher>>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_defaults(mut self, defaults: DefaultProcessors) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn BundleStore> {
        &self.store
    }

    pub fn registries(&self) -> &Arc<GeneratorRegistries> {
        &self.registries
    }

    pub fn reader(&self) -> &Arc<dyn ResourceReader> {
        &self.reader
    }

    /// Per-member processor in effect for a bundle.
    fn unitary_for<'a>(&'a self, bundle: &'a Bundle) -> Option<&'a Arc<dyn PostProcessor>> {
        bundle.unitary.as_ref().or(if bundle.is_composite() {
            self.defaults.composite_unitary.as_ref()
        } else {
            self.defaults.unitary.as_ref()
        })
    }

    /// Whole-content processor in effect for a bundle.
    fn postprocess_for<'a>(&'a self, bundle: &'a Bundle) -> Option<&'a Arc<dyn PostProcessor>> {
        bundle.postprocess.as_ref().or(if bundle.is_composite() {
            self.defaults.composite_bundle.as_ref()
        } else {
            self.defaults.bundle.as_ref()
        })
    }
}
