//! Content transforms applied per member (unitary) and per joined bundle.
//!
//! Post-processors are resolved from names in configuration through
//! [`by_name`]; an unknown name fails when the configuration is validated,
//! never at join time.

mod browser;
mod global;
mod license;
mod manifest;
mod minify;
mod url_rewrite;

use std::path::Path;
use std::sync::Arc;

pub use browser::BrowserConditionalPostProcessor;
pub use global::{GlobalContext, GlobalProcessor};
pub use license::LicensePostProcessor;
pub use manifest::{MANIFEST_FILE, ManifestWriter};
pub use minify::MinifyPostProcessor;
pub use url_rewrite::CssUrlRewriter;

use crate::bundle::BundleProcessingStatus;
use crate::config::ConfigError;
use crate::core::Result;

/// Chain value disabling post-processing for a slot.
pub const NONE: &str = "none";

/// A content transform.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this processor reveals variants while walking content.
    ///
    /// Bundles using such a processor are joined twice: once searching
    /// (the processor records variants into the status) and once for real.
    fn is_variant_discovering(&self) -> bool {
        false
    }

    fn post_process(&self, status: &mut BundleProcessingStatus<'_>, content: String)
    -> Result<String>;
}

/// Runs processors in order, feeding each the previous output.
#[derive(Default)]
pub struct ChainedPostProcessor {
    name: String,
    processors: Vec<Arc<dyn PostProcessor>>,
}

impl ChainedPostProcessor {
    pub fn new(processors: Vec<Arc<dyn PostProcessor>>) -> Self {
        let name = processors
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(",");
        Self { name, processors }
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl PostProcessor for ChainedPostProcessor {
    fn name(&self) -> &str {
        if self.processors.is_empty() { NONE } else { &self.name }
    }

    fn is_variant_discovering(&self) -> bool {
        self.processors.iter().any(|p| p.is_variant_discovering())
    }

    fn post_process(
        &self,
        status: &mut BundleProcessingStatus<'_>,
        content: String,
    ) -> Result<String> {
        self.processors
            .iter()
            .try_fold(content, |content, p| p.post_process(status, content))
    }
}

/// Built-in post-processor for a configuration name.
pub fn by_name(name: &str) -> Option<Arc<dyn PostProcessor>> {
    let processor: Arc<dyn PostProcessor> = match name {
        minify::NAME => Arc::new(MinifyPostProcessor),
        url_rewrite::NAME => Arc::new(CssUrlRewriter),
        browser::NAME => Arc::new(BrowserConditionalPostProcessor),
        license::NAME => Arc::new(LicensePostProcessor),
        _ => return None,
    };
    Some(processor)
}

/// Parse a comma-separated chain.
///
/// An empty chain means "use the default for this slot" (`None`), while
/// `none` yields an explicit no-op chain.
pub fn parse_chain(chain: &str) -> Result<Option<Arc<dyn PostProcessor>>, ConfigError> {
    let chain = chain.trim();
    if chain.is_empty() {
        return Ok(None);
    }
    if chain == NONE {
        return Ok(Some(Arc::new(ChainedPostProcessor::default())));
    }

    let processors = chain
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| by_name(name).ok_or_else(|| ConfigError::UnknownPostProcessor(name.into())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Arc::new(ChainedPostProcessor::new(processors))))
}

/// Built-in global processor for a configuration name.
///
/// Processors writing files put them below `working_dir`.
pub fn global_by_name(name: &str, working_dir: &Path) -> Option<Arc<dyn GlobalProcessor>> {
    let processor: Arc<dyn GlobalProcessor> = match name {
        manifest::NAME => Arc::new(ManifestWriter::new(working_dir)),
        _ => return None,
    };
    Some(processor)
}

/// Parse a comma-separated list of global processors. Empty or `none`
/// yields no processor.
pub fn parse_global_chain(
    chain: &str,
    working_dir: &Path,
) -> Result<Vec<Arc<dyn GlobalProcessor>>, ConfigError> {
    let chain = chain.trim();
    if chain == NONE {
        return Ok(Vec::new());
    }
    chain
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            global_by_name(name, working_dir)
                .ok_or_else(|| ConfigError::UnknownPostProcessor(name.into()))
        })
        .collect()
}
