//! Per-join processing state handed to post-processors.

use super::Bundle;
use crate::core::Mode;
use crate::variant::{VariantMap, VariantSet, VariantSpace};

/// Whether a post-processor is looking at one member or the joined bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
    File,
    Bundle,
}

/// Ephemeral state for one join of one bundle variant.
pub struct BundleProcessingStatus<'a> {
    pub bundle: &'a Bundle,
    /// Resolved variant selection. Empty for the unvaried join.
    pub variants: VariantMap,
    /// Member (or child bundle id) most recently appended.
    pub last_path_added: String,
    pub phase: ProcessingPhase,
    pub mode: Mode,
    searching_variants: bool,
    discovered: VariantSpace,
}

impl<'a> BundleProcessingStatus<'a> {
    pub fn new(bundle: &'a Bundle, variants: VariantMap, mode: Mode) -> Self {
        Self {
            bundle,
            variants,
            last_path_added: String::new(),
            phase: ProcessingPhase::File,
            mode,
            searching_variants: false,
            discovered: VariantSpace::new(),
        }
    }

    /// Status for the discovery pass: output is discarded and processors
    /// report the variants they could produce instead.
    pub fn searching(bundle: &'a Bundle, variants: VariantMap, mode: Mode) -> Self {
        Self {
            searching_variants: true,
            ..Self::new(bundle, variants, mode)
        }
    }

    #[inline]
    pub fn is_searching_variants(&self) -> bool {
        self.searching_variants
    }

    /// Selected value of a variant type, if any.
    pub fn variant(&self, variant_type: &str) -> Option<&str> {
        self.variants.get(variant_type).map(String::as_str)
    }

    /// Record a variant value found while searching.
    pub fn add_discovered_variant(&mut self, variant_type: &str, default: &str, value: &str) {
        self.discovered
            .insert_value(VariantSet::new(variant_type, default, [value]));
    }

    /// Fold variants found by a nested join (a composite child) into this one.
    pub fn merge_discovered(&mut self, found: VariantSpace) {
        for set in found.sets() {
            self.discovered.insert_value(set.clone());
        }
    }

    #[cfg(test)]
    pub fn discovered(&self) -> &VariantSpace {
        &self.discovered
    }

    pub fn take_discovered(&mut self) -> VariantSpace {
        std::mem::take(&mut self.discovered)
    }
}
