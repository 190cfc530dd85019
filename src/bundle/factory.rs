//! Builds the bundle set from configuration.

use std::sync::Arc;

use super::{Bundle, BundleSet, InclusionScope};
use crate::config::{BundleConfig, ConfigError, SheafConfig};
use crate::debug;
use crate::generator::GeneratorRegistries;
use crate::postprocess::{PostProcessor, parse_chain};
use crate::variant::VariantSpace;

/// Create every configured bundle.
///
/// Variants declared by generators for a bundle's members are merged into
/// the configured ones; conflicting defaults are a configuration error.
pub fn build_bundles(
    config: &SheafConfig,
    registries: &GeneratorRegistries,
) -> Result<BundleSet, ConfigError> {
    let bundles = config
        .bundle
        .iter()
        .map(|entry| build_bundle(entry, registries))
        .collect::<Result<Vec<_>, _>>()?;
    BundleSet::new(bundles)
}

fn chain(names: Option<&str>) -> Result<Option<Arc<dyn PostProcessor>>, ConfigError> {
    names.map_or(Ok(None), parse_chain)
}

fn build_bundle(
    entry: &BundleConfig,
    registries: &GeneratorRegistries,
) -> Result<Bundle, ConfigError> {
    let resource_type = entry.resolved_type().ok_or_else(|| {
        ConfigError::Validation(format!("cannot infer the type of bundle `{}`", entry.id))
    })?;

    let bundle = if entry.is_composite() {
        Bundle::composite(&entry.id, resource_type, entry.children.iter().cloned())
    } else {
        Bundle::simple(&entry.id, resource_type, entry.members.iter().cloned())
            .with_debug_members(entry.debug_members.iter().cloned())
    };

    let registry = registries.get(resource_type);
    let mut variants = entry.variant_space();
    for member in entry.members.iter().chain(&entry.debug_members) {
        let declared: VariantSpace = registry.available_variants(member);
        if declared.is_empty() {
            continue;
        }
        debug!("bundle"; "`{}` declares variants {:?} for `{}`",
            member, declared.types().collect::<Vec<_>>(), entry.id);
        variants = variants
            .concat(&declared)
            .map_err(|e| ConfigError::Validation(format!("bundle `{}`: {e}", entry.id)))?;
    }

    let mut bundle = bundle
        .with_name(entry.display_name())
        .with_variants(variants)
        .with_prefix(entry.prefix.clone().unwrap_or_default())
        .with_unitary(chain(entry.unitary.as_deref())?)
        .with_postprocess(chain(entry.postprocess.as_deref())?);
    bundle.scope = if entry.global {
        InclusionScope::Global
    } else {
        InclusionScope::Context
    };
    bundle.debug_only = entry.debug_only;
    bundle.production_url = entry.production_url.clone();
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::core::{Mode, ResourceType};
    use crate::generator::GeneratorEnv;
    use crate::resource::FsResourceReader;
    use std::fs;
    use tempfile::TempDir;

    fn registries(dir: &TempDir) -> GeneratorRegistries {
        GeneratorRegistries::new(GeneratorEnv {
            reader: Arc::new(FsResourceReader::new(dir.path())),
            classpath: Vec::new(),
            working_dir: dir.path().join(".sheaf"),
            use_cache: false,
        })
    }

    #[test]
    fn test_bundles_from_config() {
        let dir = TempDir::new().unwrap();
        let config = test_parse_config(
            r#"
[[bundle]]
id = "js/main.js"
members = ["js/lib.js", "js/app.js"]
debug_members = ["js/lib.js", "js/debug.js", "js/app.js"]
global = true
prefix = "res/"
postprocess = "license"

[bundle.variants.theme]
default = "light"
values = ["light", "dark"]

[[bundle]]
id = "js/all.js"
children = ["js/main.js"]
"#,
        );
        let set = build_bundles(&config, &registries(&dir)).unwrap();
        let main = set.get("js/main.js").unwrap();
        assert_eq!(main.name, "main");
        assert_eq!(main.resource_type, ResourceType::Js);
        assert_eq!(main.scope, InclusionScope::Global);
        assert_eq!(main.prefix, "res/");
        assert_eq!(main.members(Mode::Debug).len(), 3);
        assert_eq!(main.postprocess.as_ref().unwrap().name(), "license");
        assert!(main.unitary.is_none());
        assert_eq!(main.variants().keys(), ["light", "dark", ""]);

        let all = set.get("js/all.js").unwrap();
        assert!(all.is_composite());
        assert_eq!(set.ancestors("js/main.js")[0].id, "js/all.js");
    }

    #[test]
    fn test_generator_declared_variants_are_merged() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("i18n")).unwrap();
        fs::write(dir.path().join("i18n/app.properties"), "a=b\n").unwrap();
        fs::write(dir.path().join("i18n/app_fr.properties"), "a=c\n").unwrap();
        fs::write(dir.path().join("i18n/app_de.properties"), "a=d\n").unwrap();

        let config = test_parse_config(
            r#"
[[bundle]]
id = "js/i18n.js"
members = ["messages:i18n/app"]

[bundle.variants.locale]
default = ""
values = ["it"]
"#,
        );
        let set = build_bundles(&config, &registries(&dir)).unwrap();
        let locales = set.get("js/i18n.js").unwrap().variants();
        assert_eq!(locales.get("locale").unwrap().values, ["", "it", "de", "fr"]);
    }

    #[test]
    fn test_conflicting_generator_default_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("i18n")).unwrap();
        fs::write(dir.path().join("i18n/app_fr.properties"), "a=c\n").unwrap();

        let config = test_parse_config(
            r#"
[[bundle]]
id = "js/i18n.js"
members = ["messages:i18n/app"]

[bundle.variants.locale]
default = "en"
values = ["en"]
"#,
        );
        let err = build_bundles(&config, &registries(&dir)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("conflicting default")));
    }
}
