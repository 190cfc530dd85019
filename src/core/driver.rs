//! Processing mode for joins and generators.

use std::fmt;

/// Whether content is produced for a bundle build or for debug serving.
///
/// Debug output is typically un-minified and keeps member boundaries, so
/// generators cache the two modes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Building the joined, post-processed bundle.
    Bundle,
    /// Serving individual members for debugging.
    Debug,
}

impl Mode {
    /// Check if this is bundle-building mode.
    #[inline]
    pub const fn is_bundle(self) -> bool {
        matches!(self, Self::Bundle)
    }

    /// Directory name used by caches keyed on mode.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
