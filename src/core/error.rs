//! Runtime error types for the bundling engine.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = BundlingError> = std::result::Result<T, E>;

/// Errors raised while resolving, generating, joining or storing bundles.
#[derive(Debug, Error)]
pub enum BundlingError {
    #[error("resource not found: `{0}`")]
    NotFound(String),

    #[error("invalid resource path: `{0}`")]
    InvalidPath(String),

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(
        "resolver `{resolver}` of generator `{incoming}` collides with generator `{existing}`"
    )]
    ResolverCollision {
        resolver: String,
        existing: String,
        incoming: String,
    },

    #[error("no generator found for `{0}`")]
    NoGenerator(String),

    #[error("generator `{generator}` failed on `{path}`: {message}")]
    Generator {
        generator: String,
        path: String,
        message: String,
    },

    #[error("post-processor `{processor}` failed: {message}")]
    PostProcess { processor: String, message: String },

    #[error(
        "variant type `{variant_type}` has conflicting default values `{first}` and `{second}`"
    )]
    ConflictingDefaultVariant {
        variant_type: String,
        first: String,
        second: String,
    },

    #[error("bundle store error: {0}")]
    Store(String),

    /// A single bundle failed to build; previously published content stays.
    #[error("failed to build bundle `{bundle}`")]
    Bundling {
        bundle: String,
        #[source]
        source: Box<BundlingError>,
    },

    #[error("another bundling process is already running")]
    Busy,

    /// Cooperative cancellation. Not an error condition for logging purposes.
    #[error("bundling process interrupted")]
    Interrupted,
}

impl BundlingError {
    /// Wrap an error as the failure of one bundle's build.
    pub fn in_bundle(self, bundle: &str) -> Self {
        match self {
            // Keep cancellation recognizable at every level
            Self::Interrupted => Self::Interrupted,
            other => Self::Bundling {
                bundle: bundle.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Whether this error (or the one it wraps) is a cancellation.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Interrupted => true,
            Self::Bundling { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }

    /// Helper for generator failures with a displayable cause.
    pub fn generator(generator: &str, path: &str, message: impl std::fmt::Display) -> Self {
        Self::Generator {
            generator: generator.to_string(),
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}
