//! `sheaf paths`: list the current request path of every bundle variant.

use anyhow::Result;

use super::Runtime;
use crate::address::request_path;
use crate::bundle::BundleSet;
use crate::config::SheafConfig;
use crate::core::CancelToken;

pub fn paths(config: &SheafConfig, shutdown: CancelToken) -> Result<()> {
    let runtime = Runtime::new(config, shutdown)?;
    runtime.init()?;
    for line in request_paths(runtime.coordinator.bundles()) {
        println!("{line}");
    }
    Ok(())
}

/// One line per bundle variant: `id [key] path`, live bundles marked `*`.
fn request_paths(bundles: &BundleSet) -> Vec<String> {
    let mut lines = Vec::new();
    for bundle in bundles.iter() {
        if let Some(url) = &bundle.production_url {
            lines.push(format!("{}  {}", bundle.id, url));
            continue;
        }
        let live = if bundle.state().live { " *" } else { "" };
        let mut keys = bundle.variants().keys();
        keys.dedup();
        for key in keys {
            let label = if key.is_empty() { String::new() } else { format!(" [{key}]") };
            lines.push(format!("{}{}  {}{}", bundle.id, label, request_path(bundle, &key), live));
        }
    }
    lines
}
