//! Request-path manifest, rewritten after every build batch.
//!
//! Lets pages that are not rendered through the link helpers find the
//! current path of each bundle variant:
//!
//! ```json
//! {
//!   "mode": "bundle",
//!   "global": ["jquery.js"],
//!   "bundles": {
//!     "js/main.js": { "": "res/js/main-1a2b3c4d.js", "fr": "res/js/main@fr-9c0d1e2f.js" },
//!     "jquery.js": { "": "https://cdn.example.com/jquery.js" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{GlobalContext, GlobalProcessor};
use crate::address::request_path;
use crate::bundle::InclusionScope;
use crate::core::{BundlingError, Result};
use crate::debug;
use crate::utils::plural_count;

pub const NAME: &str = "manifest";

/// File name below the working directory.
pub const MANIFEST_FILE: &str = "bundle-manifest.json";

#[derive(Serialize)]
struct Manifest<'a> {
    mode: &'static str,
    /// Bundles to include on every page, in definition order
    global: Vec<&'a str>,
    /// Bundle id -> variant key -> request path
    bundles: BTreeMap<&'a str, BTreeMap<String, String>>,
}

/// Writes [`MANIFEST_FILE`] once the batch is joined.
pub struct ManifestWriter {
    path: PathBuf,
}

impl ManifestWriter {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            path: working_dir.join(MANIFEST_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GlobalProcessor for ManifestWriter {
    fn name(&self) -> &str {
        NAME
    }

    fn post_process(&self, ctx: &GlobalContext<'_>) -> Result<()> {
        let bundles = ctx
            .bundles
            .iter()
            .map(|bundle| {
                let paths = match &bundle.production_url {
                    Some(url) => BTreeMap::from([(String::new(), url.clone())]),
                    None => bundle
                        .variants()
                        .keys()
                        .into_iter()
                        .map(|key| {
                            let path = request_path(bundle, &key);
                            (key, path)
                        })
                        .collect(),
                };
                (bundle.id.as_str(), paths)
            })
            .collect();

        let global = ctx
            .bundles
            .iter()
            .filter(|bundle| bundle.scope == InclusionScope::Global)
            .map(|bundle| bundle.id.as_str())
            .collect();

        let manifest = Manifest {
            mode: ctx.mode.dir_name(),
            global,
            bundles,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BundlingError::Store(format!("cannot serialize manifest: {e}")))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| BundlingError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(&self.path, json).map_err(|e| BundlingError::Io(self.path.clone(), e))?;

        debug!("manifest"; "wrote {} after {} ({})",
            self.path.display(),
            plural_count(ctx.batch.len(), "bundle"),
            if ctx.full_build { "full build" } else { "rebuild" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Bundle, BundleSet};
    use crate::core::{Mode, ResourceType};
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_lists_current_paths() {
        let dir = TempDir::new().unwrap();
        let mut cdn = Bundle::simple("cdn.js", ResourceType::Js, ["cdn.js"]);
        cdn.production_url = Some("https://cdn.example.com/cdn.js".into());
        cdn.scope = InclusionScope::Global;
        let set = BundleSet::new(vec![
            Bundle::simple("js/main.js", ResourceType::Js, ["a.js"]).with_prefix("res/"),
            cdn,
        ])
        .unwrap();
        let main = set.get("js/main.js").unwrap();
        let mut state = (*main.state()).clone();
        state.hashes.insert(String::new(), "1a2b".into());
        main.publish(state);

        let writer = ManifestWriter::new(&dir.path().join("work"));
        let batch = vec![main.clone()];
        writer
            .post_process(&GlobalContext {
                bundles: &set,
                batch: &batch,
                mode: Mode::Bundle,
                full_build: true,
            })
            .unwrap();

        let json: Value = serde_json::from_str(&fs::read_to_string(writer.path()).unwrap()).unwrap();
        assert_eq!(json["mode"], "bundle");
        assert_eq!(json["global"], serde_json::json!(["cdn.js"]));
        assert_eq!(json["bundles"]["js/main.js"][""], "res/js/main-1a2b.js");
        assert_eq!(json["bundles"]["cdn.js"][""], "https://cdn.example.com/cdn.js");
    }
}
