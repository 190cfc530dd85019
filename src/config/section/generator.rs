//! `[generator]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [generator]
//! cache = true
//! classpath = ["vendor", "~/shared/web"]   # Roots searched for `jar:` paths
//!
//! [[generator.custom]]
//! name = "messages"          # Factory name
//! prefix = "i18n"            # Serves `i18n:...` paths
//! type = "js"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::ResourceType;
use crate::generator::Resolver;

/// Generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Cache expensive generator output in the working directory.
    pub cache: bool,

    /// Roots for `jar:` paths, relative to sheaf.toml.
    pub classpath: Vec<PathBuf>,

    /// Extra resolver registrations.
    pub custom: Vec<CustomGeneratorConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cache: true,
            classpath: Vec::new(),
            custom: Vec::new(),
        }
    }
}

/// A generator factory bound to a prefix or suffix resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomGeneratorConfig {
    pub name: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Resource types to register for. Empty means all text types.
    #[serde(rename = "type")]
    pub types: Vec<ResourceType>,
}

impl CustomGeneratorConfig {
    /// The resolver, when exactly one of `prefix`/`suffix` is set.
    pub fn resolver(&self) -> Option<Resolver> {
        match (&self.prefix, &self.suffix) {
            (Some(p), None) => Some(Resolver::prefix(p.clone())),
            (None, Some(s)) => Some(Resolver::suffix(s.trim_start_matches('.').to_string())),
            _ => None,
        }
    }

    pub fn applies_to(&self, resource_type: ResourceType) -> bool {
        if self.types.is_empty() {
            resource_type.is_text()
        } else {
            self.types.contains(&resource_type)
        }
    }
}
