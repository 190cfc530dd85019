//! Member resolution and joining.

use std::path::PathBuf;

use rustc_hash::FxHashSet;

use super::{BundlingEngine, LinkedFiles};
use crate::bundle::{Bundle, BundleProcessingStatus, BundleSet, ProcessingPhase};
use crate::core::{BuildContext, BundlingError, Result};
use crate::freshness::mtime::last_modified;
use crate::log;
use crate::utils::path::{join, normalize};
use crate::variant::VariantMap;

const BOM: char = '\u{feff}';

/// Members of a bundle after directory expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMembers {
    /// Resource paths in join order, without duplicates.
    pub paths: Vec<String>,
    /// Directory members that were expanded.
    pub dirs: Vec<String>,
}

impl BundlingEngine {
    /// Expand directory members (`dir/` flat, `dir/**` recursive) into the
    /// sorted files matching the bundle's resource type.
    pub fn resolve_members(&self, bundle: &Bundle) -> ResolvedMembers {
        let registry = self.registries.get(bundle.resource_type);
        let mut resolved = ResolvedMembers::default();
        let mut seen = FxHashSet::default();

        for member in bundle.members(self.mode) {
            if registry.is_generated(member) {
                if seen.insert(member.clone()) {
                    resolved.paths.push(member.clone());
                }
                continue;
            }

            let (dir, recursive) = match member.strip_suffix("/**") {
                Some(dir) => (Some(dir), true),
                None => (member.strip_suffix('/'), false),
            };
            match dir {
                Some(dir) => self.expand_dir(bundle, &normalize(dir), recursive, &mut resolved, &mut seen),
                None => {
                    let path = normalize(member);
                    if seen.insert(path.clone()) {
                        resolved.paths.push(path);
                    }
                }
            }
        }
        resolved
    }

    fn expand_dir(
        &self,
        bundle: &Bundle,
        dir: &str,
        recursive: bool,
        resolved: &mut ResolvedMembers,
        seen: &mut FxHashSet<String>,
    ) {
        match self.reader.is_directory(dir) {
            Ok(true) => {}
            Ok(false) => {
                log!("warn"; "member `{}/` of `{}` is not a directory", dir, bundle.id);
                return;
            }
            Err(_) => {
                log!("warn"; "a mapped directory was not found: {}/", dir);
                return;
            }
        }
        resolved.dirs.push(dir.to_string());

        let names = match self.reader.list_resource_names(dir) {
            Ok(names) => names,
            Err(e) => {
                log!("warn"; "cannot list `{}`: {}", dir, e);
                return;
            }
        };
        for name in names {
            match name.strip_suffix('/') {
                Some(sub) if recursive => {
                    self.expand_dir(bundle, &join(dir, sub), true, resolved, seen);
                }
                Some(_) => {}
                None if bundle.resource_type.matches(&name) => {
                    let path = join(dir, &name);
                    if seen.insert(path.clone()) {
                        resolved.paths.push(path);
                    }
                }
                None => {}
            }
        }
    }

    /// Read one member, through its generator when the path is virtual.
    fn read_member(
        &self,
        bundle: &Bundle,
        path: &str,
        status: &BundleProcessingStatus<'_>,
        linked: &mut LinkedFiles,
    ) -> Result<String> {
        let registry = self.registries.get(bundle.resource_type);
        if let Some(resolution) = registry.resolve(path) {
            let generated =
                resolution.generate(path, &status.variants, status.mode, self.reader.as_ref())?;
            for file in generated.linked {
                track(linked, file);
            }
            return Ok(generated.content);
        }

        // Missing members are tracked too (as mtime 0) so creating them
        // later dirties the bundle
        let content = self.reader.get_resource(path);
        if let Some(real) = self.reader.real_path(path) {
            let mtime = match &content {
                Ok(_) => last_modified(&real).unwrap_or(0),
                Err(_) => 0,
            };
            linked.insert(real, mtime);
        }
        content
    }

    /// Join the members of a simple bundle for `status.variants` and apply
    /// its post-processors.
    ///
    /// Missing members are skipped with a warning. Any other failure
    /// (generator, post-processor) fails the join.
    pub fn join_bundle(
        &self,
        bundle: &Bundle,
        members: &[String],
        status: &mut BundleProcessingStatus<'_>,
        linked: &mut LinkedFiles,
    ) -> Result<String> {
        let unitary = self.unitary_for(bundle);
        let mut joined = String::new();
        let mut first = true;

        for path in members {
            status.phase = ProcessingPhase::File;
            status.last_path_added = path.clone();

            let mut content = match self.read_member(bundle, path, status, linked) {
                Ok(content) => content,
                Err(BundlingError::NotFound(_)) => {
                    log!("warn"; "a mapped resource was not found: {} (bundle `{}`)", path, bundle.id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            // A byte-order mark is only meaningful at the very start
            if !first && content.starts_with(BOM) {
                content.remove(0);
            }
            first = false;
            if !content.ends_with('\n') {
                content.push('\n');
            }
            if let Some(processor) = unitary {
                content = processor.post_process(status, content)?;
            }
            joined.push_str(&content);
        }

        status.phase = ProcessingPhase::Bundle;
        status.last_path_added = bundle.id.clone();
        match self.postprocess_for(bundle) {
            Some(processor) => processor.post_process(status, joined),
            None => Ok(joined),
        }
    }

    /// Join the children of a composite for one variant selection.
    ///
    /// Each child is joined with its own processors, passed through the
    /// composite's unitary processor and appended; the concatenation then
    /// goes through the composite's bundle processor. Debug-only children
    /// are left out.
    pub fn join_composite(
        &self,
        bundles: &BundleSet,
        composite: &Bundle,
        status: &mut BundleProcessingStatus<'_>,
        ctx: &BuildContext,
        linked: &mut LinkedFiles,
    ) -> Result<String> {
        let unitary = self.unitary_for(composite);
        let mut joined = String::new();

        for child in bundles.children_of(composite) {
            ctx.check()?;
            if child.debug_only {
                continue;
            }

            let variants = if status.variants.is_empty() {
                VariantMap::new()
            } else {
                child.variants().resolve(&status.variants)
            };
            let mut child_status = if status.is_searching_variants() {
                BundleProcessingStatus::searching(&child, variants, status.mode)
            } else {
                BundleProcessingStatus::new(&child, variants, status.mode)
            };

            let content = self
                .join_any(bundles, &child, &mut child_status, ctx, linked)
                .map_err(|e| e.in_bundle(&child.id))?;
            status.merge_discovered(child_status.take_discovered());

            status.phase = ProcessingPhase::File;
            status.last_path_added = child.id.clone();
            let content = match unitary {
                Some(processor) => processor.post_process(status, content)?,
                None => content,
            };
            joined.push_str(&content);
        }

        status.phase = ProcessingPhase::Bundle;
        status.last_path_added = composite.id.clone();
        match self.postprocess_for(composite) {
            Some(processor) => processor.post_process(status, joined),
            None => Ok(joined),
        }
    }

    /// Join a simple or composite bundle.
    pub fn join_any(
        &self,
        bundles: &BundleSet,
        bundle: &Bundle,
        status: &mut BundleProcessingStatus<'_>,
        ctx: &BuildContext,
        linked: &mut LinkedFiles,
    ) -> Result<String> {
        if bundle.is_composite() {
            self.join_composite(bundles, bundle, status, ctx, linked)
        } else {
            let members = self.resolve_members(bundle);
            self.join_bundle(bundle, &members.paths, status, linked)
        }
    }
}

fn track(linked: &mut LinkedFiles, path: PathBuf) {
    if let Some(mtime) = last_modified(&path) {
        linked.insert(path, mtime);
    }
}
