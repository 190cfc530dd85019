//! `sheaf check <path>`: classify a request path.

use anyhow::Result;

use super::Runtime;
use crate::address::{Validity, classify, parse_request, request_path};
use crate::config::SheafConfig;
use crate::core::{CancelToken, ResourceType};
use crate::debug;
use crate::generator::GeneratorRegistries;

pub fn check(config: &SheafConfig, path: &str, shutdown: CancelToken) -> Result<()> {
    let runtime = Runtime::new(config, shutdown)?;
    runtime.init()?;
    let bundles = runtime.coordinator.bundles();
    let engine = runtime.coordinator.engine();

    let validity = classify(bundles, path);
    println!("{path}: {validity}");

    if let Some(request) = parse_request(bundles, path)
        && let Some(bundle) = bundles.get(&request.bundle_id)
    {
        debug!("check"; "parsed as {:?}", request);
        let current = request_path(bundle, &request.variant_key);
        if current != path {
            println!("current: {current}");
        }

        let name = bundle.variant_name(&request.variant_key);
        let store = engine.store();
        if validity == Validity::Valid
            && let (Ok(plain), Ok(gzip)) =
                (store.get_bundle_bytes(&name, false), store.get_bundle_bytes(&name, true))
        {
            println!("stored: {} bytes ({} gzipped)", plain.len(), gzip.len());
        }
        return Ok(());
    }

    if let Some(kind) = generated_kind(engine.registries(), path) {
        println!("not a bundle; generated {kind}");
    }
    Ok(())
}

/// How the generator registries would serve a non-bundle path.
fn generated_kind(registries: &GeneratorRegistries, path: &str) -> Option<String> {
    ResourceType::ALL.into_iter().find_map(|rt| {
        let registry = registries.get(rt);
        if !registry.is_generated(path) {
            return None;
        }
        let kind = if registry.is_generated_binary(path) {
            "binary resource"
        } else if registry.is_handling_embedded_image(path) {
            "CSS image resource"
        } else {
            "resource"
        };
        Some(format!("{rt} {kind}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorEnv;
    use crate::resource::{FsResourceReader, ResourceReader};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_generated_kind() {
        let dir = TempDir::new().unwrap();
        let reader: Arc<dyn ResourceReader> = Arc::new(FsResourceReader::new(dir.path()));
        let registries = GeneratorRegistries::new(GeneratorEnv {
            reader,
            classpath: Vec::new(),
            working_dir: dir.path().join(".work"),
            use_cache: false,
        });

        assert_eq!(
            generated_kind(&registries, "messages:i18n/app").as_deref(),
            Some("js resource")
        );
        assert_eq!(generated_kind(&registries, "js/app.js"), None);
    }
}
