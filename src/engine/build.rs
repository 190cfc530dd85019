//! Building and publishing one bundle.

use std::collections::{BTreeMap, BTreeSet};

use super::{BundlingEngine, LinkedFiles};
use crate::bundle::{Bundle, BundleProcessingStatus, BundleSet, BundleState};
use crate::core::{BuildContext, Result};
use crate::{debug, log};
use crate::freshness::mtime::last_modified;
use crate::utils::plural_count;
use crate::variant::{VariantSpace, variant_key};

/// Placeholder in joined content that is resolved per request.
pub const LIVE_PLACEHOLDER: &str = "{{SHEAF_BUNDLE_PATH}}";

impl BundlingEngine {
    /// Whether joining `bundle` can reveal variants, through its own
    /// processors or those of any child.
    pub fn is_variant_discovering(&self, bundles: &BundleSet, bundle: &Bundle) -> bool {
        let own = [self.unitary_for(bundle), self.postprocess_for(bundle)]
            .into_iter()
            .flatten()
            .any(|p| p.is_variant_discovering());
        own || bundles
            .children_of(bundle)
            .iter()
            .any(|child| self.is_variant_discovering(bundles, child))
    }

    /// Variant space a build starts from.
    ///
    /// A composite unions the current spaces of its children, so children
    /// must be built first.
    fn initial_space(&self, bundles: &BundleSet, bundle: &Bundle) -> Result<VariantSpace> {
        bundles
            .children_of(bundle)
            .iter()
            .filter(|child| !child.debug_only)
            .try_fold(bundle.declared_variants.clone(), |space, child| {
                space.concat(&child.variants())
            })
    }

    /// Build every variant of `bundle`, store the content and publish the
    /// new state.
    ///
    /// With a variant-discovering processor chain the bundle is first
    /// joined once per known variant in searching mode; the variants found
    /// are merged in, then the real join runs over the grown space. On any
    /// error nothing is published and the previous state stays visible.
    pub fn build_bundle(&self, bundles: &BundleSet, bundle: &Bundle, ctx: &BuildContext) -> Result<()> {
        ctx.check()?;
        let mut space = self.initial_space(bundles, bundle)?;

        if self.is_variant_discovering(bundles, bundle) {
            let mut discovered = VariantSpace::new();
            for variants in space.enumerate() {
                ctx.check()?;
                let mut status =
                    BundleProcessingStatus::searching(bundle, variants.unwrap_or_default(), self.mode);
                self.join_any(bundles, bundle, &mut status, ctx, &mut LinkedFiles::new())?;
                discovered = discovered.concat(&status.take_discovered())?;
            }
            if !discovered.is_empty() {
                debug!("build"; "`{}` revealed variants {:?}",
                    bundle.id, discovered.types().collect::<Vec<_>>());
                space = space.concat(&discovered)?;
            }
        }

        let mut linked = LinkedFiles::new();
        let mut outputs = Vec::new();
        for variants in space.enumerate() {
            ctx.check()?;
            let key = variants.as_ref().map(variant_key).unwrap_or_default();
            let mut status =
                BundleProcessingStatus::new(bundle, variants.unwrap_or_default(), self.mode);
            let content = self.join_any(bundles, bundle, &mut status, ctx, &mut linked)?;
            outputs.push((key, content));
        }

        let mut hashes = BTreeMap::new();
        let mut live = false;
        for (key, content) in &outputs {
            live |= content.contains(LIVE_PLACEHOLDER);
            if let Some(hasher) = &self.hasher {
                hashes.insert(key.clone(), hasher.hash(content.as_bytes()));
            }
        }

        let watched_dirs: BTreeSet<_> = if bundle.is_composite() {
            BTreeSet::new()
        } else {
            self.resolve_members(bundle)
                .dirs
                .iter()
                .filter_map(|dir| self.reader.real_path(dir))
                .collect()
        };

        // Directory listings count as inputs: adding a file changes the mtime
        for dir in &watched_dirs {
            if let Some(mtime) = last_modified(dir) {
                linked.insert(dir.clone(), mtime);
            }
        }

        self.store_variants(bundle, &outputs)?;
        debug!("build"; "built `{}` ({})", bundle.id, plural_count(outputs.len(), "variant"));
        bundle.publish(BundleState {
            variants: space,
            hashes,
            linked,
            watched_dirs,
            live,
        });
        Ok(())
    }

    /// Write every variant output of a build, all or nothing.
    ///
    /// Runs after all variants are joined and hashed, right before the new
    /// state is published. Until then readers may briefly see new content
    /// under the old hashes. If a write fails, the variants already written
    /// get their previous content back so stored content keeps matching the
    /// published hashes.
    fn store_variants(&self, bundle: &Bundle, outputs: &[(String, String)]) -> Result<()> {
        let names: Vec<String> = outputs.iter().map(|(key, _)| bundle.variant_name(key)).collect();
        let previous: Vec<Option<String>> = names
            .iter()
            .map(|name| self.store.get_bundle(name).ok())
            .collect();

        for (idx, (name, (_, content))) in names.iter().zip(outputs).enumerate() {
            if let Err(e) = self.store.store_bundle(name, content) {
                for (name, old) in names[..idx].iter().zip(&previous) {
                    let Some(old) = old else { continue };
                    if let Err(e) = self.store.store_bundle(name, old) {
                        log!("warn"; "cannot restore previous content of `{}`: {}", name, e);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Ids of bundles whose content needs request-time processing.
    pub fn live_bundles(&self, bundles: &BundleSet) -> Vec<String> {
        bundles
            .iter()
            .filter(|b| b.state().live)
            .map(|b| b.id.clone())
            .collect()
    }

    /// Whether every variant of a bundle has stored content.
    pub fn has_stored_content(&self, bundle: &Bundle) -> bool {
        bundle
            .variants()
            .keys()
            .iter()
            .all(|key| self.store.contains(&bundle.variant_name(key)))
    }
}
