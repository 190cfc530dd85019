//! In-memory bundle representation.
//!
//! Configuration-derived fields are immutable for the process lifetime.
//! Build output (variant space, per-variant hashes, linked files) lives in a
//! [`BundleState`] behind an `ArcSwap`, so readers always see the last fully
//! published state while a rebuild prepares the next one.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::core::{Mode, ResourceType};
use crate::postprocess::PostProcessor;
use crate::variant::{VariantSpace, variant_bundle_name};

/// Where a bundle is included by link renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InclusionScope {
    /// Included on every page.
    Global,
    /// Included only where referenced.
    Context,
}

/// What a bundle aggregates.
#[derive(Debug, Clone)]
pub enum BundleKind {
    Simple {
        members: Vec<String>,
        debug_members: Vec<String>,
    },
    Composite {
        children: Vec<String>,
    },
}

/// Published build output of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleState {
    /// Declared variants plus those discovered by post-processors.
    pub variants: VariantSpace,
    /// Content hash per variant key (`""` for the unvaried build).
    pub hashes: BTreeMap<String, String>,
    /// Files the content was built from, with their modification time.
    pub linked: BTreeMap<PathBuf, u64>,
    /// Directory members; files created in them dirty the bundle.
    pub watched_dirs: BTreeSet<PathBuf>,
    /// Content carries a placeholder resolved at request time.
    pub live: bool,
}

pub struct Bundle {
    pub id: String,
    pub name: String,
    pub resource_type: ResourceType,
    pub kind: BundleKind,
    pub scope: InclusionScope,
    pub debug_only: bool,
    /// Request prefix, e.g. `"res/"`. Empty when none is configured.
    pub prefix: String,
    /// Externally hosted production location; the bundle is never built.
    pub production_url: Option<String>,
    pub unitary: Option<Arc<dyn PostProcessor>>,
    pub postprocess: Option<Arc<dyn PostProcessor>>,
    /// Variants from configuration and generator declarations.
    pub declared_variants: VariantSpace,
    state: ArcSwap<BundleState>,
    dirty: AtomicBool,
}

impl Bundle {
    fn with_kind(id: impl Into<String>, resource_type: ResourceType, kind: BundleKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            resource_type,
            kind,
            scope: InclusionScope::Context,
            debug_only: false,
            prefix: String::new(),
            production_url: None,
            unitary: None,
            postprocess: None,
            declared_variants: VariantSpace::new(),
            state: ArcSwap::from_pointee(BundleState::default()),
            // Nothing is built yet
            dirty: AtomicBool::new(true),
        }
    }

    pub fn simple(
        id: impl Into<String>,
        resource_type: ResourceType,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::with_kind(
            id,
            resource_type,
            BundleKind::Simple {
                members: members.into_iter().map(Into::into).collect(),
                debug_members: Vec::new(),
            },
        )
    }

    pub fn composite(
        id: impl Into<String>,
        resource_type: ResourceType,
        children: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::with_kind(
            id,
            resource_type,
            BundleKind::Composite {
                children: children.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_debug_members(mut self, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let BundleKind::Simple { debug_members, .. } = &mut self.kind {
            *debug_members = members.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn with_variants(mut self, variants: VariantSpace) -> Self {
        self.state.store(Arc::new(BundleState {
            variants: variants.clone(),
            ..BundleState::default()
        }));
        self.declared_variants = variants;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_unitary(mut self, processor: Option<Arc<dyn PostProcessor>>) -> Self {
        self.unitary = processor;
        self
    }

    pub fn with_postprocess(mut self, processor: Option<Arc<dyn PostProcessor>>) -> Self {
        self.postprocess = processor;
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, BundleKind::Composite { .. })
    }

    /// Child bundle ids. Empty for simple bundles.
    pub fn children(&self) -> &[String] {
        match &self.kind {
            BundleKind::Composite { children } => children,
            BundleKind::Simple { .. } => &[],
        }
    }

    /// Members joined in `mode`.
    ///
    /// Debug members replace the regular list for debug-only bundles and in
    /// debug mode, when any are configured.
    pub fn members(&self, mode: Mode) -> &[String] {
        match &self.kind {
            BundleKind::Simple {
                members,
                debug_members,
            } => {
                if (self.debug_only || !mode.is_bundle()) && !debug_members.is_empty() {
                    debug_members
                } else {
                    members
                }
            }
            BundleKind::Composite { .. } => &[],
        }
    }

    /// Name the content of one variant is stored under.
    pub fn variant_name(&self, key: &str) -> String {
        variant_bundle_name(&self.id, key, false)
    }

    // ------------------------------------------------------------------------
    // Published state
    // ------------------------------------------------------------------------

    /// Snapshot of the last published state.
    pub fn state(&self) -> Arc<BundleState> {
        self.state.load_full()
    }

    /// Atomically replace the published state.
    pub fn publish(&self, state: BundleState) {
        self.state.store(Arc::new(state));
    }

    /// Current hash for a variant key.
    pub fn hash(&self, key: &str) -> Option<String> {
        self.state.load().hashes.get(key).cloned()
    }

    /// Effective variant space (declared plus discovered).
    pub fn variants(&self) -> VariantSpace {
        self.state.load().variants.clone()
    }

    // ------------------------------------------------------------------------
    // Dirty flag
    // ------------------------------------------------------------------------

    /// Mark dirty. Returns `true` if the bundle was clean.
    pub fn mark_dirty(&self) -> bool {
        !self.dirty.swap(true, Ordering::AcqRel)
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("id", &self.id)
            .field("resource_type", &self.resource_type)
            .field("kind", &self.kind)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}
