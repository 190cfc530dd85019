//! `[postprocess]` section configuration.
//!
//! Each entry is a comma-separated chain of named post-processors applied
//! to every bundle that does not set its own. `"none"` disables a phase.
//! `global` lists processors run once per build batch instead.
//!
//! # Example
//!
//! ```toml
//! [postprocess]
//! unitary = "css-url-rewriter"
//! bundle = "license,minify"
//! composite_unitary = ""
//! composite_bundle = "license"
//! global = "manifest"
//! ```

use serde::{Deserialize, Serialize};

/// Default post-processor chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    pub unitary: String,
    pub bundle: String,
    pub composite_unitary: String,
    pub composite_bundle: String,
    /// Global processors, run around every build batch.
    pub global: String,
}

impl PostprocessConfig {
    /// `(field, chain)` pairs, for validation.
    pub fn chains(&self) -> [(&'static str, &str); 4] {
        [
            ("postprocess.unitary", &self.unitary),
            ("postprocess.bundle", &self.bundle),
            ("postprocess.composite_unitary", &self.composite_unitary),
            ("postprocess.composite_bundle", &self.composite_bundle),
        ]
    }
}
