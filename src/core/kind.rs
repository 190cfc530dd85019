//! Resource type definitions.

use serde::{Deserialize, Serialize};

use crate::utils::path::extension;

/// Kind of resource a bundle aggregates, determines member filtering,
/// the built-in generator set and minification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Js,
    Css,
    Binary,
}

impl ResourceType {
    pub const ALL: [Self; 3] = [Self::Js, Self::Css, Self::Binary];

    /// Short lowercase name (`js`, `css`, `binary`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
            Self::Binary => "binary",
        }
    }

    /// File extensions picked up when a directory is mapped as a member.
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Js => &["js", "mjs", "coffee"],
            Self::Css => &["css", "less"],
            Self::Binary => &["png", "gif", "jpg", "jpeg", "svg", "webp", "ico", "woff", "woff2"],
        }
    }

    /// Check whether a resource path belongs to this type by extension.
    pub fn matches(self, path: &str) -> bool {
        extension(path).is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            self.extensions().contains(&ext.as_str())
        })
    }

    /// Whether joined content is text (JS/CSS) rather than raw bytes.
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::Binary)
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
