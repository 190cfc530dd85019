//! `[[bundle]]` entries.
//!
//! # Example
//!
//! ```toml
//! [[bundle]]
//! id = "js/main.js"
//! members = ["js/lib.js", "js/app.js", "js/widgets/", "messages:i18n/app"]
//! debug_members = ["js/debug-tools.js"]
//! postprocess = "license,minify"
//!
//! [bundle.variants.theme]
//! default = "light"
//! values = ["light", "dark"]
//!
//! [[bundle]]
//! id = "js/all.js"
//! children = ["js/main.js", "js/admin.js"]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ResourceType;
use crate::variant::{VariantSet, VariantSpace};

/// One bundle definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Request-routable id, e.g. `js/main.js`.
    pub id: String,

    /// Display name. Defaults to the id's file stem.
    pub name: Option<String>,

    /// Resource type. Inferred from the id's extension when absent.
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,

    /// Ordered member paths (simple bundle).
    pub members: Vec<String>,

    /// Ordered child bundle ids (composite bundle).
    pub children: Vec<String>,

    /// Members used in debug mode.
    pub debug_members: Vec<String>,

    /// Included on every page rather than per context.
    pub global: bool,

    /// Only built in debug mode.
    pub debug_only: bool,

    /// Request path prefix, e.g. `gz/`.
    pub prefix: Option<String>,

    /// Externally hosted URL used instead of a local build.
    pub production_url: Option<String>,

    /// Unitary post-processor chain overriding the default.
    pub unitary: Option<String>,

    /// Bundle post-processor chain overriding the default.
    pub postprocess: Option<String>,

    pub variants: BTreeMap<String, VariantConfig>,
}

/// One variant axis of a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    pub default: String,
    pub values: Vec<String>,
}

impl BundleConfig {
    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }

    /// Declared or inferred resource type.
    pub fn resolved_type(&self) -> Option<ResourceType> {
        self.resource_type.or_else(|| {
            ResourceType::ALL
                .into_iter()
                .find(|t| t.is_text() && t.matches(&self.id))
        })
    }

    /// Name defaulting to the file stem of the id.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            let file = self.id.rsplit('/').next().unwrap_or(&self.id);
            file.split('.').next().unwrap_or(file).to_string()
        })
    }

    pub fn variant_space(&self) -> VariantSpace {
        self.variants
            .iter()
            .map(|(variant_type, v)| {
                VariantSet::new(variant_type.clone(), v.default.clone(), v.values.clone())
            })
            .collect()
    }
}
